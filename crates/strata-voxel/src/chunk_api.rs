//! High-level chunk wrapper: block storage, light, lifecycle flags, and neighbour links.
//!
//! [`Chunk`] wraps [`ChunkData`] and a [`LightVolume`] and tracks where the
//! chunk is in its lifecycle (created → generated → lit → meshed). Neighbour
//! links are a bitmask of directions; the neighbouring chunk itself is always
//! resolved through the chunk manager's map, so a chunk never owns or points
//! at another chunk.

use crate::chunk::ChunkData;
use crate::coords::{ChunkPos, Direction};
use crate::light::LightVolume;
use crate::registry::BlockId;

/// Dirty-flag bit: chunk mesh needs rebuilding.
pub const MESH_DIRTY: u8 = 0b0000_0001;

/// Set of directions in which a loaded neighbour is linked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborLinks(u8);

impl NeighborLinks {
    /// Returns `true` if the neighbour in `dir` is linked.
    pub fn has(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    /// Marks `dir` as linked.
    pub fn link(&mut self, dir: Direction) {
        self.0 |= dir.bit();
    }

    /// Clears the link in `dir`.
    pub fn unlink(&mut self, dir: Direction) {
        self.0 &= !dir.bit();
    }

    /// Number of linked directions.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Linked directions in [`Direction::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |dir| self.has(*dir))
    }
}

/// A loaded voxel chunk.
///
/// Out-of-bounds reads return air and out-of-bounds writes are ignored.
#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    data: ChunkData,
    light: LightVolume,
    generated: bool,
    lit: bool,
    /// Bitfield of dirty flags.
    dirty: u8,
    /// Incremented on every change to mesh inputs: blocks, light or neighbours.
    version: u64,
    neighbors: NeighborLinks,
}

impl Chunk {
    /// Creates an air-filled, ungenerated chunk.
    pub fn new(pos: ChunkPos, size: usize) -> Self {
        Self {
            pos,
            data: ChunkData::new(size),
            light: LightVolume::new(size),
            generated: false,
            lit: false,
            dirty: 0,
            version: 0,
            neighbors: NeighborLinks::default(),
        }
    }

    /// Chunk-space position.
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Side length in voxels.
    pub fn size(&self) -> usize {
        self.data.size()
    }

    /// Returns the block at local `(x, y, z)`, or air if out of bounds.
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.data.get(x, y, z)
    }

    /// Writes a block at local `(x, y, z)`.
    ///
    /// Marks the mesh dirty and bumps the version when the block changes.
    /// Returns whether anything changed.
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> bool {
        if self.data.index_of(x, y, z).is_none() {
            tracing::warn!("Chunk::set out of bounds at {}: ({}, {}, {})", self.pos, x, y, z);
            return false;
        }
        if !self.data.set(x, y, z, block) {
            return false;
        }
        self.dirty |= MESH_DIRTY;
        self.version += 1;
        true
    }

    /// Installs freshly generated block data and marks the chunk generated.
    ///
    /// Light is reset and must be recomputed. The dirty flag is left to the
    /// caller, which flags the whole neighbourhood at once.
    pub fn populate(&mut self, data: ChunkData) {
        self.light = LightVolume::new(data.size());
        self.data = data;
        self.generated = true;
        self.lit = false;
        self.version += 1;
    }

    /// Whether terrain generation has completed.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Whether the light volume has been computed since the last population.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Records that lighting has been computed.
    pub fn set_lit(&mut self, lit: bool) {
        self.lit = lit;
    }

    /// Returns the current dirty flags.
    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if the specified dirty flag (or combination) is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    /// Mark specific dirty flags. Marking the mesh dirty also bumps the
    /// version, so a mesh built before this call is older than any built after.
    pub fn mark_dirty(&mut self, flags: u8) {
        self.dirty |= flags;
        if flags & MESH_DIRTY != 0 {
            self.version += 1;
        }
    }

    /// Clears the specified dirty flag bits.
    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Returns the current version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Block storage.
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    /// Light storage.
    pub fn light(&self) -> &LightVolume {
        &self.light
    }

    /// Mutable light storage.
    pub fn light_mut(&mut self) -> &mut LightVolume {
        &mut self.light
    }

    /// Block storage alongside mutable light storage.
    pub fn data_and_light_mut(&mut self) -> (&ChunkData, &mut LightVolume) {
        (&self.data, &mut self.light)
    }

    /// Neighbour link bitmask.
    pub fn neighbors(&self) -> NeighborLinks {
        self.neighbors
    }

    pub(crate) fn link_neighbor(&mut self, dir: Direction) {
        self.neighbors.link(dir);
    }

    pub(crate) fn unlink_neighbor(&mut self, dir: Direction) {
        self.neighbors.unlink(dir);
    }

    /// Whether every voxel is air.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Palette length of the underlying storage.
    pub fn palette_len(&self) -> usize {
        self.data.palette_len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new(ChunkPos::new(0, 0, 0), 16)
    }

    #[test]
    fn test_new_chunk_is_not_dirty_or_generated() {
        let chunk = chunk();
        assert_eq!(chunk.dirty_flags(), 0);
        assert_eq!(chunk.version(), 0);
        assert!(!chunk.is_generated());
        assert!(!chunk.is_lit());
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_set_marks_mesh_dirty_and_bumps_version() {
        let mut chunk = chunk();
        assert!(chunk.set(1, 2, 3, BlockId(4)));
        assert!(chunk.is_dirty(MESH_DIRTY));
        assert_eq!(chunk.version(), 1);
        assert_eq!(chunk.get(1, 2, 3), BlockId(4));

        chunk.clear_dirty(MESH_DIRTY);
        assert!(!chunk.set(1, 2, 3, BlockId(4)));
        assert!(!chunk.is_dirty(MESH_DIRTY));
        assert_eq!(chunk.version(), 1);
    }

    #[test]
    fn test_mark_mesh_dirty_bumps_version() {
        let mut chunk = chunk();
        chunk.mark_dirty(MESH_DIRTY);
        assert_eq!(chunk.version(), 1);

        // Already dirty: still a new version, the inputs changed again.
        chunk.mark_dirty(MESH_DIRTY);
        assert_eq!(chunk.version(), 2);

        chunk.mark_dirty(0b0000_0010);
        assert_eq!(chunk.version(), 2);
        assert!(chunk.is_dirty(0b0000_0010));
    }

    #[test]
    fn test_set_out_of_bounds_no_panic() {
        let mut chunk = chunk();
        assert!(!chunk.set(16, 0, 0, BlockId(1)));
        assert!(!chunk.set(0, -1, 0, BlockId(1)));
        assert_eq!(chunk.version(), 0);
        assert_eq!(chunk.get(16, 0, 0), BlockId::AIR);
    }

    #[test]
    fn test_populate_resets_light() {
        let mut chunk = chunk();
        chunk.light_mut().set_channel(crate::light::LightChannel::Sky, 0, 0, 0, 15);
        chunk.set_lit(true);

        let mut data = ChunkData::new(16);
        data.fill(BlockId(1));
        chunk.populate(data);

        assert!(chunk.is_generated());
        assert!(!chunk.is_lit());
        assert_eq!(chunk.light().get(0, 0, 0).sky(), 0);
        assert_eq!(chunk.get(5, 5, 5), BlockId(1));
        assert_eq!(chunk.version(), 1);
    }

    #[test]
    fn test_neighbor_links() {
        let mut chunk = chunk();
        chunk.link_neighbor(Direction::PosX);
        chunk.link_neighbor(Direction::NegY);
        assert!(chunk.neighbors().has(Direction::PosX));
        assert_eq!(chunk.neighbors().count(), 2);
        chunk.unlink_neighbor(Direction::PosX);
        assert_eq!(chunk.neighbors().iter().collect::<Vec<_>>(), vec![Direction::NegY]);
    }
}
