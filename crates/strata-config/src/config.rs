//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Chunk edge lengths the storage layer supports.
pub const SUPPORTED_CHUNK_SIZES: [u32; 2] = [16, 32];

/// Smallest unload buffer that still prevents load/unload oscillation.
pub const MIN_UNLOAD_BUFFER: u32 = 2;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World shape.
    pub world: WorldConfig,
    /// Chunk streaming around the camera.
    pub streaming: StreamingConfig,
    /// Heightmap terrain.
    pub terrain: TerrainConfig,
    /// Light propagation budgets.
    pub lighting: LightingConfig,
    /// Background worker pools.
    pub workers: WorkerConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World shape configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for terrain generation.
    pub seed: u64,
    /// Chunk edge length in blocks (16 or 32).
    pub chunk_size: u32,
    /// Vertical chunk layers in the world.
    pub height_chunks: u32,
    /// Region edge length in chunks.
    pub region_size: u32,
}

/// Chunk streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Columns within this many chunks of the camera are loaded.
    pub load_radius: u32,
    /// Extra chunks beyond the load radius before a column is unloaded.
    pub unload_buffer: u32,
    /// Columns created per tick.
    pub loads_per_tick: u32,
    /// Columns removed per tick.
    pub unloads_per_tick: u32,
}

/// Heightmap terrain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    pub octaves: u32,
    /// Frequency of the first octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
    pub persistence: f64,
    pub lacunarity: f64,
    /// Height the surface oscillates around, in blocks.
    pub base_height: f64,
    /// Dirt layers under the grass surface.
    pub dirt_depth: u32,
}

/// Light propagation budgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Nodes visited per sky light seed.
    pub sky_node_budget: usize,
    /// Nodes visited per block light pass.
    pub block_node_budget: usize,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Terrain generation threads; 0 picks a count from available cores.
    pub generation_threads: usize,
    pub meshing_threads: usize,
    /// Park timeout of an idle worker, in milliseconds.
    pub idle_backoff_ms: u64,
    /// How long shutdown waits for workers, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Render distance in chunks.
    pub render_distance: u32,
    /// Mesh uploads installed per frame.
    pub uploads_per_frame: usize,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 16,
            height_chunks: 8,
            region_size: 8,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: 8,
            unload_buffer: 2,
            loads_per_tick: 16,
            unloads_per_tick: 32,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            base_frequency: 0.01,
            amplitude: 24.0,
            persistence: 0.5,
            lacunarity: 2.0,
            base_height: 48.0,
            dirt_depth: 3,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sky_node_budget: 1000,
            block_node_budget: 10_000,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            generation_threads: 0,
            meshing_threads: 1,
            idle_backoff_ms: 2,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_distance: 8,
            uploads_per_frame: 4,
            fov: 70.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

impl Config {
    /// Checks values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid(reason));
        if !SUPPORTED_CHUNK_SIZES.contains(&self.world.chunk_size) {
            return invalid(format!(
                "world.chunk_size must be one of {:?}, got {}",
                SUPPORTED_CHUNK_SIZES, self.world.chunk_size
            ));
        }
        if self.world.height_chunks == 0 {
            return invalid("world.height_chunks must be at least 1".to_string());
        }
        if self.world.region_size == 0 {
            return invalid("world.region_size must be at least 1".to_string());
        }
        if self.streaming.unload_buffer < MIN_UNLOAD_BUFFER {
            return invalid(format!(
                "streaming.unload_buffer must be at least {MIN_UNLOAD_BUFFER}, got {}",
                self.streaming.unload_buffer
            ));
        }
        if self.streaming.loads_per_tick == 0 || self.streaming.unloads_per_tick == 0 {
            return invalid("streaming per-tick limits must be non-zero".to_string());
        }
        if self.lighting.sky_node_budget == 0 || self.lighting.block_node_budget == 0 {
            return invalid("lighting budgets must be non-zero".to_string());
        }
        if self.workers.meshing_threads == 0 {
            return invalid("workers.meshing_threads must be at least 1".to_string());
        }
        if self.render.uploads_per_frame == 0 {
            return invalid("render.uploads_per_frame must be at least 1".to_string());
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Default config directory: `<platform config dir>/strata`.
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strata"))
    }
}
