//! Procedural terrain: fBm heightmap sampling, the layered column fill rule, and
//! the background generation worker pool.

mod generator;
mod heightmap;
mod worker;

use strata_voxel::ChunkPos;
use thiserror::Error;

pub use generator::{HeightmapTerrain, TerrainBlocks, TerrainConfig, TerrainSource};
pub use heightmap::{HeightmapParams, HeightmapSampler};
pub use worker::{CompletionHook, GenerationStats, GeneratorConfig, TerrainGenerator};

/// Errors raised while generating a chunk.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The chunk was unloaded before its data could be installed.
    #[error("chunk {0} was unloaded during generation")]
    Evicted(ChunkPos),
    /// A block the generator needs is not registered.
    #[error("terrain block '{0}' is not registered")]
    MissingBlock(String),
    /// The terrain source reported a failure.
    #[error("terrain source failed: {0}")]
    Source(String),
    /// A worker thread could not be started.
    #[error("failed to spawn generation worker: {0}")]
    Spawn(#[from] std::io::Error),
}
