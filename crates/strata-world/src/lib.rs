//! A running voxel world: the chunk manager plus the generation, lighting,
//! and meshing stages wired together, driven by a logic tick and edited
//! through [`World::set_block`].
//!
//! Data flows one way. The loader creates chunks, which queues generation;
//! a generation worker fills the chunk and lights it through the completion
//! hook; the dirty flag then routes it to meshing, whose upload queue is
//! drained by a [`ChunkRenderer`] on the render thread.

mod settings;

use std::sync::Arc;

use glam::Vec3;
use strata_config::{Config, ConfigError};
use strata_lighting::LightingEngine;
use strata_mesh::{GridAtlas, MeshError, MeshingPipeline};
use strata_render::{ChunkRenderer, FrameStats, RenderBackend, RenderConfig, ViewVolume};
use strata_terrain::{
    CompletionHook, GenerationError, GenerationStats, HeightmapTerrain, TerrainBlocks, TerrainGenerator,
};
use strata_voxel::{
    BlockId, BlockPos, BlockRegistry, ChunkLoadError, ChunkLoader, ChunkManager, ChunkPos, VoxelLight,
};
use thiserror::Error;

pub use settings::{
    chunk_load_config, generator_config, lighting_config, meshing_config, render_config, terrain_config,
};

/// Errors raised while building a world or resolving edits.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid streaming settings: {0}")]
    Streaming(#[from] ChunkLoadError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Meshing(#[from] MeshError),
    #[error("unknown block '{0}'")]
    UnknownBlock(String),
}

/// What one logic tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Column the focus was in.
    pub focus: (i32, i32),
    pub loaded: Vec<ChunkPos>,
    pub unloaded: Vec<ChunkPos>,
    /// Stalled chunks whose generation was requested again.
    pub retried: usize,
}

/// Owns every stage of the chunk pipeline for one session.
pub struct World {
    registry: Arc<BlockRegistry>,
    manager: Arc<ChunkManager>,
    lighting: Arc<LightingEngine>,
    generator: TerrainGenerator,
    meshing: MeshingPipeline,
    loader: ChunkLoader,
    render_config: RenderConfig,
    retries_per_tick: usize,
}

impl World {
    /// Builds a world with the built-in blocks.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the config is invalid or a worker pool
    /// cannot be started.
    pub fn new(config: &Config) -> Result<Self, WorldError> {
        Self::with_registry(config, BlockRegistry::with_defaults())
    }

    /// Builds a world over a caller-supplied registry, which must contain
    /// the terrain blocks (`stone`, `dirt`, `grass`).
    pub fn with_registry(config: &Config, registry: BlockRegistry) -> Result<Self, WorldError> {
        config.validate()?;

        let registry = Arc::new(registry);
        let chunk_size = config.world.chunk_size as usize;
        let manager = Arc::new(ChunkManager::new(
            chunk_size,
            config.world.region_size as i32,
            chunk_load_config(config),
        )?);

        let lighting = Arc::new(LightingEngine::new(Arc::clone(&registry), lighting_config(config)));
        let terrain = HeightmapTerrain::new(terrain_config(config), TerrainBlocks::from_registry(&registry)?);

        let hook_lighting = Arc::clone(&lighting);
        let on_generated: CompletionHook = Arc::new(move |manager: &ChunkManager, pos: ChunkPos| {
            let report = hook_lighting.light_chunk(manager, pos);
            tracing::trace!(
                "lit chunk {pos}: {} nodes, {} chunks changed",
                report.nodes,
                report.changed_chunks.len()
            );
        });

        let generator = TerrainGenerator::spawn(
            &generator_config(config),
            Arc::clone(&manager),
            Arc::new(terrain),
            Some(on_generated),
        )?;
        let atlas = Arc::new(GridAtlas::from_registry(&registry));
        let meshing = MeshingPipeline::spawn(&meshing_config(config), Arc::clone(&manager), Arc::clone(&registry), atlas)?;

        tracing::info!(
            "world ready: seed {}, {}³ chunks, {} layers, load radius {}",
            config.world.seed,
            chunk_size,
            config.world.height_chunks,
            config.streaming.load_radius
        );

        Ok(Self {
            registry,
            manager,
            lighting,
            generator,
            meshing,
            loader: ChunkLoader::new(),
            render_config: render_config(config),
            retries_per_tick: config.streaming.loads_per_tick as usize,
        })
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<ChunkManager> {
        &self.manager
    }

    pub fn meshing(&self) -> &MeshingPipeline {
        &self.meshing
    }

    pub fn generation_stats(&self) -> &Arc<GenerationStats> {
        self.generator.stats()
    }

    /// Renderer settings derived from the config.
    pub fn render_config(&self) -> &RenderConfig {
        &self.render_config
    }

    /// Chunk column containing the world-space point `focus`.
    pub fn focus_column(&self, focus: Vec3) -> (i32, i32) {
        let size = self.manager.chunk_size() as f32;
        ((focus.x / size).floor() as i32, (focus.z / size).floor() as i32)
    }

    /// Streams chunks around `focus`: unloads far columns, creates missing
    /// ones nearest first, and re-requests generation that previously failed.
    pub fn tick(&mut self, focus: Vec3) -> TickReport {
        let (cx, cz) = self.focus_column(focus);
        self.manager.set_focus(cx, cz);
        let result = self.loader.tick(&self.manager, cx, cz);
        let retried = self.manager.retry_stalled_generation(self.retries_per_tick);
        if !result.loaded.is_empty() || retried > 0 {
            self.generator.wake();
        }
        TickReport {
            focus: (cx, cz),
            loaded: result.loaded,
            unloaded: result.unloaded,
            retried,
        }
    }

    /// Runs one render frame against this world's chunks.
    pub fn render<B: RenderBackend>(&self, renderer: &mut ChunkRenderer<B>, view: &dyn ViewVolume) -> FrameStats {
        let stats = renderer.render_frame(&self.manager, &self.meshing, view);
        if stats.remesh_requests > 0 {
            self.meshing.wake();
        }
        stats
    }

    /// Block at `pos`, or air if its chunk is not loaded.
    pub fn block_at(&self, pos: BlockPos) -> BlockId {
        self.manager.block_at(pos)
    }

    /// Light at `pos`, or darkness if its chunk is not loaded.
    pub fn light_at(&self, pos: BlockPos) -> VoxelLight {
        let (chunk_pos, (x, y, z)) = pos.to_chunk_local(self.manager.chunk_size());
        match self.manager.get_chunk(chunk_pos) {
            Some(chunk) => chunk.read().light().get(x as i32, y as i32, z as i32),
            None => VoxelLight::default(),
        }
    }

    /// Places `block` at `pos`, relights around it, and flags the affected
    /// chunks for remeshing.
    ///
    /// Returns the replaced block, or `None` if nothing changed because the
    /// chunk is not loaded, not yet generated, or already holds `block`.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) -> Option<BlockId> {
        let (chunk_pos, _) = pos.to_chunk_local(self.manager.chunk_size());
        let generated = self.manager.get_chunk(chunk_pos)?.read().is_generated();
        if !generated {
            tracing::debug!("ignoring edit at {pos:?}: chunk {chunk_pos} is not generated yet");
            return None;
        }

        let previous = self.manager.set_block_at(pos, block)?;
        let report = self.lighting.update_lighting_at(&self.manager, pos, previous);
        self.manager.mark_neighbors_for_remesh(chunk_pos);
        tracing::debug!(
            "set {pos:?} from {previous:?} to {block:?}; light touched {} chunks",
            report.changed_chunks.len()
        );
        Some(previous)
    }

    /// [`set_block`](Self::set_block) by block identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownBlock`] if `identifier` is not registered.
    pub fn set_block_named(&self, pos: BlockPos, identifier: &str) -> Result<Option<BlockId>, WorldError> {
        let block = self
            .registry
            .lookup(identifier)
            .ok_or_else(|| WorldError::UnknownBlock(identifier.to_string()))?;
        Ok(self.set_block(pos, block))
    }

    /// Stops both worker pools and drops every chunk. Idempotent.
    pub fn shutdown(&mut self) {
        self.generator.shutdown();
        self.meshing.shutdown();
        self.manager.clear();
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.shutdown();
    }
}
