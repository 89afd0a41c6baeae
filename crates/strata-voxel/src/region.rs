//! Regions: fixed horizontal groups of chunk columns used for broad-phase culling.
//!
//! A region owns no voxel data, only the set of chunk positions currently
//! loaded inside it and precomputed world-space bounds.

use glam::Vec3;
use rustc_hash::FxHashSet;

use crate::coords::{ChunkPos, RegionPos};

/// World-space bounding volumes of a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionBounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
    /// Centre of the bounding sphere.
    pub center: Vec3,
    /// Radius of the bounding sphere.
    pub radius: f32,
}

impl RegionBounds {
    /// Bounds of the region at `pos` with `region_size` chunks per edge and a
    /// world `height_chunks` layers tall.
    pub fn new(pos: RegionPos, region_size: i32, chunk_size: usize, height_chunks: u32) -> Self {
        let edge = (region_size as f32) * chunk_size as f32;
        let min = Vec3::new(pos.x as f32 * edge, 0.0, pos.z as f32 * edge);
        let max = min + Vec3::new(edge, height_chunks as f32 * chunk_size as f32, edge);
        let center = (min + max) * 0.5;
        Self {
            min,
            max,
            center,
            radius: (max - center).length(),
        }
    }

    /// Returns `true` if any part of the bounding sphere lies within
    /// `max_distance` of `point`.
    pub fn is_within(&self, point: Vec3, max_distance: f32) -> bool {
        let reach = max_distance + self.radius;
        self.center.distance_squared(point) <= reach * reach
    }
}

/// A horizontal group of chunk columns.
#[derive(Clone, Debug)]
pub struct Region {
    pos: RegionPos,
    bounds: RegionBounds,
    chunks: FxHashSet<ChunkPos>,
}

impl Region {
    /// Creates an empty region.
    pub fn new(pos: RegionPos, bounds: RegionBounds) -> Self {
        Self {
            pos,
            bounds,
            chunks: FxHashSet::default(),
        }
    }

    /// Region-space position.
    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    /// Precomputed bounds.
    pub fn bounds(&self) -> &RegionBounds {
        &self.bounds
    }

    /// Adds a chunk. Returns `false` if it was already present.
    pub fn insert(&mut self, chunk: ChunkPos) -> bool {
        self.chunks.insert(chunk)
    }

    /// Removes a chunk. Returns `false` if it was not present.
    pub fn remove(&mut self, chunk: &ChunkPos) -> bool {
        self.chunks.remove(chunk)
    }

    /// Loaded chunk positions in this region.
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkPos> {
        self.chunks.iter()
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the region holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
