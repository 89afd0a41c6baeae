//! Central owner for all loaded chunks and the region grid above them.
//!
//! Chunks live in a concurrent map of shared handles
//! ([`ChunkHandle`]), so generation, lighting, meshing, and the render thread
//! can all reach them without a global lock. Neighbour relations are never
//! stored as pointers: a chunk only records which directions are linked, and
//! the neighbour itself is looked up in the map.
//!
//! Locking discipline: a map shard lock may be followed by a region shard
//! lock or the generation queue lock, never the reverse, and no code path
//! holds two chunk locks at the same time.

use std::sync::Arc;

use dashmap::DashMap;
use glam::Vec3;
use parking_lot::{Mutex, RwLock};

use crate::chunk_api::{Chunk, MESH_DIRTY};
use crate::chunk_loading::{ChunkLoadConfig, ChunkLoadError, columns_in_radius};
use crate::coords::{BlockPos, ChunkPos, Direction, RegionPos};
use crate::generation_queue::GenerationQueue;
use crate::region::{Region, RegionBounds};
use crate::registry::BlockId;

/// Shared, lockable chunk.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// Owns all currently-loaded chunks and provides fast access by [`ChunkPos`].
///
/// This is the single authority for which chunks exist in memory.
pub struct ChunkManager {
    chunk_size: usize,
    region_size: i32,
    load_config: ChunkLoadConfig,
    chunks: DashMap<ChunkPos, ChunkHandle>,
    regions: DashMap<RegionPos, Region>,
    generation: Arc<GenerationQueue>,
    /// Focus column used to prioritise generation requests.
    focus: Mutex<(i32, i32)>,
}

impl ChunkManager {
    /// Creates an empty manager.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkLoadError`] if `load_config` violates the hysteresis
    /// invariant.
    pub fn new(chunk_size: usize, region_size: i32, load_config: ChunkLoadConfig) -> Result<Self, ChunkLoadError> {
        load_config.validate()?;
        Ok(Self {
            chunk_size,
            region_size: region_size.max(1),
            load_config,
            chunks: DashMap::new(),
            regions: DashMap::new(),
            generation: Arc::new(GenerationQueue::new()),
            focus: Mutex::new((0, 0)),
        })
    }

    /// Side length of every chunk in voxels.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of vertical chunk layers.
    pub fn height_chunks(&self) -> u32 {
        self.load_config.height_chunks
    }

    /// Loading configuration.
    pub fn load_config(&self) -> &ChunkLoadConfig {
        &self.load_config
    }

    /// Queue consumed by terrain generation workers.
    pub fn generation_queue(&self) -> &Arc<GenerationQueue> {
        &self.generation
    }

    /// Moves the generation focus to column `(x, z)`.
    pub fn set_focus(&self, x: i32, z: i32) {
        *self.focus.lock() = (x, z);
    }

    fn generation_priority(&self, pos: ChunkPos) -> i64 {
        let (fx, fz) = *self.focus.lock();
        // Within a column, generate top-down so sky light can be inherited.
        pos.column_distance_sq(fx, fz) * 64 - pos.y as i64
    }

    /// Returns the chunk at `pos`, creating an air-filled one if absent.
    ///
    /// Creation is atomic with respect to other callers: exactly one chunk is
    /// ever created per position, it is registered in its region, and its
    /// generation is requested before any caller can observe it.
    pub fn get_or_create_chunk(&self, pos: ChunkPos) -> ChunkHandle {
        if let Some(existing) = self.chunks.get(&pos) {
            return Arc::clone(existing.value());
        }
        let entry = self.chunks.entry(pos).or_insert_with(|| {
            self.register_in_region(pos);
            self.generation.request(pos, self.generation_priority(pos));
            tracing::trace!("created chunk {pos}");
            Arc::new(RwLock::new(Chunk::new(pos, self.chunk_size)))
        });
        Arc::clone(entry.value())
    }

    fn register_in_region(&self, pos: ChunkPos) {
        let region_pos = pos.region(self.region_size);
        self.regions
            .entry(region_pos)
            .or_insert_with(|| {
                let bounds = RegionBounds::new(region_pos, self.region_size, self.chunk_size, self.height_chunks());
                Region::new(region_pos, bounds)
            })
            .insert(pos);
    }

    /// Returns the chunk at `pos` if loaded.
    pub fn get_chunk(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a chunk is loaded at `pos`.
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Removes the chunk at `pos`.
    ///
    /// Every loaded neighbour's link back to the chunk is cleared before the
    /// returned handle is released, the chunk leaves its region (dropping the
    /// region if it became empty), and any queued generation is withdrawn.
    pub fn remove_chunk(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        let (_, handle) = self.chunks.remove(&pos)?;

        for dir in Direction::ALL {
            if let Some(neighbor) = self.get_chunk(pos.offset(dir)) {
                neighbor.write().unlink_neighbor(dir.opposite());
            }
        }
        {
            let mut chunk = handle.write();
            for dir in Direction::ALL {
                chunk.unlink_neighbor(dir);
            }
        }

        let region_pos = pos.region(self.region_size);
        if let Some(mut region) = self.regions.get_mut(&region_pos) {
            region.remove(&pos);
        }
        self.regions.remove_if(&region_pos, |_, region| region.is_empty());

        self.generation.cancel(pos);
        tracing::trace!("removed chunk {pos}");
        Some(handle)
    }

    /// Links `pos` with every loaded neighbour, in both directions.
    pub fn update_chunk_neighbors(&self, pos: ChunkPos) {
        let Some(handle) = self.get_chunk(pos) else {
            return;
        };
        let mut linked = Vec::with_capacity(6);
        for dir in Direction::ALL {
            if let Some(neighbor) = self.get_chunk(pos.offset(dir)) {
                neighbor.write().link_neighbor(dir.opposite());
                linked.push(dir);
            }
        }
        let mut chunk = handle.write();
        for dir in linked {
            chunk.link_neighbor(dir);
        }
    }

    /// Resolves the linked neighbour of `pos` in `dir`.
    ///
    /// Returns `None` when the link is absent or the neighbour was evicted.
    pub fn neighbor(&self, pos: ChunkPos, dir: Direction) -> Option<ChunkHandle> {
        let linked = self.get_chunk(pos)?.read().neighbors().has(dir);
        if !linked {
            return None;
        }
        self.get_chunk(pos.offset(dir))
    }

    /// Flags the 3×3 lateral neighbourhood of `pos` (diagonals included) plus
    /// the chunks directly above and below for remeshing.
    pub fn mark_neighbors_for_remesh(&self, pos: ChunkPos) {
        let mut targets = Vec::with_capacity(11);
        for dz in -1..=1 {
            for dx in -1..=1 {
                targets.push(ChunkPos::new(pos.x + dx, pos.y, pos.z + dz));
            }
        }
        targets.push(pos.offset(Direction::PosY));
        targets.push(pos.offset(Direction::NegY));

        for target in targets {
            if let Some(chunk) = self.get_chunk(target) {
                chunk.write().mark_dirty(MESH_DIRTY);
            }
        }
    }

    /// Calls `visit` for each region whose bounding sphere lies within
    /// `max_distance` of `camera` and returns how many there were.
    ///
    /// Regions are visited in place under their shard's read lock, so
    /// `visit` must not load or unload chunks.
    pub fn for_each_visible_region(&self, camera: Vec3, max_distance: f32, mut visit: impl FnMut(&Region)) -> usize {
        let mut visited = 0;
        for entry in self.regions.iter() {
            if entry.value().bounds().is_within(camera, max_distance) {
                visit(entry.value());
                visited += 1;
            }
        }
        visited
    }

    /// Number of live regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Missing chunks inside the load radius around `(cx, cz)`, nearest first.
    pub fn get_chunks_to_load(&self, cx: i32, cz: i32) -> Vec<ChunkPos> {
        let height = self.height_chunks() as i32;
        let mut missing = Vec::new();
        for (dx, dz, _) in columns_in_radius(self.load_config.load_radius) {
            for y in (0..height).rev() {
                let pos = ChunkPos::new(cx + dx, y, cz + dz);
                if !self.chunks.contains_key(&pos) {
                    missing.push(pos);
                }
            }
        }
        missing
    }

    /// Loaded chunks beyond the unload radius of `(cx, cz)`, farthest first.
    pub fn get_chunks_to_unload(&self, cx: i32, cz: i32) -> Vec<ChunkPos> {
        let mut far: Vec<(i64, ChunkPos)> = self
            .chunks
            .iter()
            .map(|entry| *entry.key())
            .map(|pos| (pos.column_distance_sq(cx, cz), pos))
            .filter(|&(dist_sq, _)| self.load_config.beyond_unload(dist_sq))
            .collect();
        far.sort_by(|a, b| b.cmp(a));
        far.into_iter().map(|(_, pos)| pos).collect()
    }

    /// Generated chunks whose mesh is dirty. Clears the flag on each.
    pub fn take_dirty_generated(&self) -> Vec<ChunkPos> {
        let handles: Vec<ChunkHandle> = self.chunks.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut dirty = Vec::new();
        for handle in handles {
            let mut chunk = handle.write();
            if chunk.is_generated() && chunk.is_dirty(MESH_DIRTY) {
                chunk.clear_dirty(MESH_DIRTY);
                dirty.push(chunk.pos());
            }
        }
        dirty
    }

    /// Re-requests generation for loaded chunks that are neither generated
    /// nor pending, e.g. after a failed attempt. Returns how many were queued.
    pub fn retry_stalled_generation(&self, limit: usize) -> usize {
        let handles: Vec<ChunkHandle> = self.chunks.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut queued = 0;
        for handle in handles {
            if queued >= limit {
                break;
            }
            let (pos, generated) = {
                let chunk = handle.read();
                (chunk.pos(), chunk.is_generated())
            };
            if generated || self.generation.is_pending(pos) {
                continue;
            }
            if self.generation.request(pos, self.generation_priority(pos)) {
                queued += 1;
            }
        }
        queued
    }

    /// Block at a world position, or air if the chunk is not loaded.
    pub fn block_at(&self, pos: BlockPos) -> BlockId {
        let (chunk_pos, (x, y, z)) = pos.to_chunk_local(self.chunk_size);
        match self.get_chunk(chunk_pos) {
            Some(chunk) => chunk.read().get(x as i32, y as i32, z as i32),
            None => BlockId::AIR,
        }
    }

    /// Writes a block at a world position.
    ///
    /// Returns the previous block if the chunk is loaded and the block
    /// changed; `None` otherwise.
    pub fn set_block_at(&self, pos: BlockPos, block: BlockId) -> Option<BlockId> {
        let (chunk_pos, (x, y, z)) = pos.to_chunk_local(self.chunk_size);
        let handle = self.get_chunk(chunk_pos)?;
        let mut chunk = handle.write();
        let previous = chunk.get(x as i32, y as i32, z as i32);
        chunk.set(x as i32, y as i32, z as i32, block).then_some(previous)
    }

    /// Number of loaded chunks.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of all loaded chunks.
    pub fn positions(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    /// Removes every chunk and region and clears pending generation.
    pub fn clear(&self) {
        self.generation.clear();
        self.chunks.clear();
        self.regions.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
