//! Translation of the persisted [`Config`] into the settings each subsystem
//! takes.

use std::time::Duration;

use strata_config::Config;
use strata_lighting::LightingConfig;
use strata_mesh::MeshingConfig;
use strata_render::RenderConfig;
use strata_terrain::{GeneratorConfig, HeightmapParams, TerrainConfig};
use strata_voxel::ChunkLoadConfig;

pub fn chunk_load_config(config: &Config) -> ChunkLoadConfig {
    ChunkLoadConfig {
        load_radius: config.streaming.load_radius,
        unload_buffer: config.streaming.unload_buffer,
        height_chunks: config.world.height_chunks,
        loads_per_tick: config.streaming.loads_per_tick,
        unloads_per_tick: config.streaming.unloads_per_tick,
    }
}

pub fn terrain_config(config: &Config) -> TerrainConfig {
    let terrain = &config.terrain;
    TerrainConfig {
        heightmap: HeightmapParams {
            seed: config.world.seed,
            octaves: terrain.octaves,
            lacunarity: terrain.lacunarity,
            persistence: terrain.persistence,
            base_frequency: terrain.base_frequency,
            amplitude: terrain.amplitude,
            base_height: terrain.base_height,
        },
        dirt_depth: terrain.dirt_depth.min(i32::MAX as u32) as i32,
    }
}

pub fn lighting_config(config: &Config) -> LightingConfig {
    LightingConfig {
        sky_node_budget: config.lighting.sky_node_budget,
        block_node_budget: config.lighting.block_node_budget,
    }
}

/// A thread count of zero picks one from the available cores.
pub fn generator_config(config: &Config) -> GeneratorConfig {
    let workers = &config.workers;
    let threads = match workers.generation_threads {
        0 => GeneratorConfig::with_defaults().threads,
        n => n,
    };
    GeneratorConfig {
        threads,
        idle_backoff: Duration::from_millis(workers.idle_backoff_ms),
        shutdown_timeout: Duration::from_millis(workers.shutdown_timeout_ms),
    }
}

pub fn meshing_config(config: &Config) -> MeshingConfig {
    let workers = &config.workers;
    MeshingConfig {
        threads: workers.meshing_threads,
        idle_backoff: Duration::from_millis(workers.idle_backoff_ms),
        shutdown_timeout: Duration::from_millis(workers.shutdown_timeout_ms),
        ..MeshingConfig::default()
    }
}

/// Render distance is configured in chunks and drawn in world units.
pub fn render_config(config: &Config) -> RenderConfig {
    RenderConfig {
        render_distance: config.render.render_distance as f32 * config.world.chunk_size as f32,
        uploads_per_frame: config.render.uploads_per_frame,
    }
}
