//! Chunk loading/unloading with hysteresis and per-tick budgeting.
//!
//! Columns within `load_radius` of the focus column are loaded; loaded chunks
//! are only unloaded once they are farther than `load_radius + unload_buffer`.
//! The buffer between the two radii keeps a focus sitting on the boundary from
//! loading and unloading the same column every tick.

use thiserror::Error;

use crate::chunk_manager::ChunkManager;
use crate::coords::ChunkPos;

/// Smallest allowed gap between load and unload radius, in chunks.
pub const MIN_UNLOAD_MARGIN: u32 = 2;

/// Configuration for the chunk loading/unloading system.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkLoadConfig {
    /// Columns within this radius (in chunk units) around the focus are loaded.
    pub load_radius: u32,
    /// Extra distance beyond `load_radius` before a column is unloaded.
    pub unload_buffer: u32,
    /// Number of vertical chunk layers in the world.
    pub height_chunks: u32,
    /// Maximum number of chunks created per tick.
    pub loads_per_tick: u32,
    /// Maximum number of chunks removed per tick.
    pub unloads_per_tick: u32,
}

impl Default for ChunkLoadConfig {
    fn default() -> Self {
        Self {
            load_radius: 8,
            unload_buffer: 2,
            height_chunks: 4,
            loads_per_tick: 16,
            unloads_per_tick: 32,
        }
    }
}

impl ChunkLoadConfig {
    /// Radius beyond which loaded chunks are unloaded.
    pub fn unload_radius(&self) -> u32 {
        self.load_radius + self.unload_buffer
    }

    /// Checks the hysteresis and sizing invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkLoadError`] when the unload buffer is below
    /// [`MIN_UNLOAD_MARGIN`] or when the world has no vertical layers.
    pub fn validate(&self) -> Result<(), ChunkLoadError> {
        if self.unload_buffer < MIN_UNLOAD_MARGIN {
            return Err(ChunkLoadError::UnloadBufferTooSmall {
                buffer: self.unload_buffer,
                min: MIN_UNLOAD_MARGIN,
            });
        }
        if self.height_chunks == 0 {
            return Err(ChunkLoadError::NoVerticalLayers);
        }
        Ok(())
    }

    /// Whether a column at squared distance `dist_sq` should be loaded.
    pub fn within_load(&self, dist_sq: i64) -> bool {
        let r = self.load_radius as i64;
        dist_sq <= r * r
    }

    /// Whether a column at squared distance `dist_sq` should be unloaded.
    pub fn beyond_unload(&self, dist_sq: i64) -> bool {
        let r = self.unload_radius() as i64;
        dist_sq > r * r
    }
}

/// Errors from invalid loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkLoadError {
    /// The unload radius does not exceed the load radius by enough.
    #[error("unload buffer {buffer} is below the minimum hysteresis margin {min}")]
    UnloadBufferTooSmall {
        /// Configured buffer.
        buffer: u32,
        /// Required minimum.
        min: u32,
    },
    /// `height_chunks` is zero.
    #[error("world must have at least one vertical chunk layer")]
    NoVerticalLayers,
}

/// Column offsets `(dx, dz, dist_sq)` inside `radius`, nearest first.
pub fn columns_in_radius(radius: u32) -> Vec<(i32, i32, i64)> {
    let r = radius as i32;
    let r_sq = (radius as i64) * (radius as i64);
    let mut columns = Vec::new();
    for dz in -r..=r {
        for dx in -r..=r {
            let dist_sq = (dx as i64) * (dx as i64) + (dz as i64) * (dz as i64);
            if dist_sq <= r_sq {
                columns.push((dx, dz, dist_sq));
            }
        }
    }
    columns.sort_by_key(|&(dx, dz, dist_sq)| (dist_sq, dx, dz));
    columns
}

/// Result of a single loading tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkLoadTickResult {
    /// Chunks created this tick.
    pub loaded: Vec<ChunkPos>,
    /// Chunks removed this tick.
    pub unloaded: Vec<ChunkPos>,
}

/// The chunk loading/unloading controller.
///
/// Call [`ChunkLoader::tick`] each logic tick with the focus column.
#[derive(Debug, Default)]
pub struct ChunkLoader;

impl ChunkLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    /// Runs one tick of the loading/unloading system.
    ///
    /// 1. Unloads up to `unloads_per_tick` chunks beyond the unload radius.
    /// 2. Creates up to `loads_per_tick` missing chunks inside the load
    ///    radius, nearest first. Creation schedules generation.
    pub fn tick(&self, manager: &ChunkManager, focus_x: i32, focus_z: i32) -> ChunkLoadTickResult {
        let config = manager.load_config();
        let mut result = ChunkLoadTickResult::default();

        for pos in manager
            .get_chunks_to_unload(focus_x, focus_z)
            .into_iter()
            .take(config.unloads_per_tick as usize)
        {
            if manager.remove_chunk(pos).is_some() {
                result.unloaded.push(pos);
            }
        }

        for pos in manager
            .get_chunks_to_load(focus_x, focus_z)
            .into_iter()
            .take(config.loads_per_tick as usize)
        {
            manager.get_or_create_chunk(pos);
            result.loaded.push(pos);
        }

        if !result.loaded.is_empty() || !result.unloaded.is_empty() {
            tracing::debug!(
                "streaming tick at ({}, {}): loaded {}, unloaded {}",
                focus_x,
                focus_z,
                result.loaded.len(),
                result.unloaded.len()
            );
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
