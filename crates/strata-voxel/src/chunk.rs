//! Palette-compressed chunk storage for cubic voxel volumes.
//!
//! Each chunk keeps a palette of the distinct [`BlockId`] values it contains
//! and one byte per voxel indexing into that palette. Because a byte can only
//! address 256 slots, the palette is capped at [`MAX_PALETTE_SIZE`]; when it
//! fills up, unused slots are reclaimed by [`ChunkData::compact`].

use rustc_hash::FxHashMap;

use crate::registry::BlockId;

/// Default side length of a chunk in voxels.
pub const CHUNK_SIZE: usize = 32;

/// Side lengths a chunk may be configured with.
pub const SUPPORTED_CHUNK_SIZES: [usize; 2] = [16, 32];

/// Maximum number of distinct blocks a single chunk palette can hold.
pub const MAX_PALETTE_SIZE: usize = 256;

/// Initial reserved palette capacity.
const INITIAL_PALETTE_CAPACITY: usize = 4;

/// Palette-compressed voxel storage for an `S×S×S` chunk.
///
/// Voxels are flat-indexed as `x + y*S + z*S*S`. Every index byte refers to a
/// slot `< palette.len()`.
#[derive(Clone, Debug)]
pub struct ChunkData {
    size: usize,
    /// Slot → global block ID.
    palette: Vec<BlockId>,
    /// Global block ID → slot.
    reverse: FxHashMap<BlockId, u8>,
    /// Reserved palette slots; doubles on demand up to [`MAX_PALETTE_SIZE`].
    capacity: usize,
    /// One palette slot per voxel.
    indices: Vec<u8>,
}

impl ChunkData {
    /// Creates an air-filled chunk with side length `size`.
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0 && size <= 256, "unsupported chunk size {size}");
        let mut palette = Vec::with_capacity(INITIAL_PALETTE_CAPACITY);
        palette.push(BlockId::AIR);
        let mut reverse = FxHashMap::default();
        reverse.insert(BlockId::AIR, 0);
        Self {
            size,
            palette,
            reverse,
            capacity: INITIAL_PALETTE_CAPACITY,
            indices: vec![0; size * size * size],
        }
    }

    /// Side length in voxels.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of voxels.
    pub fn volume(&self) -> usize {
        self.indices.len()
    }

    /// Flat index of `(x, y, z)`, or `None` when out of bounds.
    pub fn index_of(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let s = self.size as i32;
        if x < 0 || y < 0 || z < 0 || x >= s || y >= s || z >= s {
            return None;
        }
        let s = self.size;
        Some(x as usize + y as usize * s + z as usize * s * s)
    }

    /// Returns the block at `(x, y, z)`. Out-of-bounds coordinates read as air.
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        match self.index_of(x, y, z) {
            Some(index) => self.get_index(index),
            None => BlockId::AIR,
        }
    }

    /// Returns the block at a flat index. Out-of-range indices read as air.
    pub fn get_index(&self, index: usize) -> BlockId {
        match self.indices.get(index) {
            Some(&slot) => self.palette[slot as usize],
            None => BlockId::AIR,
        }
    }

    /// Writes `block` at `(x, y, z)`.
    ///
    /// Returns `true` if the stored block changed. Out-of-bounds writes are
    /// ignored and return `false`.
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> bool {
        let Some(index) = self.index_of(x, y, z) else {
            return false;
        };
        if self.get_index(index) == block {
            return false;
        }
        let slot = self.slot_for(block, index);
        self.indices[index] = slot;
        true
    }

    /// Resets every voxel to `block`.
    pub fn fill(&mut self, block: BlockId) {
        self.palette.clear();
        self.palette.push(block);
        self.reverse.clear();
        self.reverse.insert(block, 0);
        self.capacity = INITIAL_PALETTE_CAPACITY;
        self.indices.fill(0);
    }

    /// Resolves `block` to a palette slot, inserting it when absent.
    /// The voxel at `overwriting` is about to change, so a full palette is
    /// compacted as if it no longer held its old block.
    fn slot_for(&mut self, block: BlockId, overwriting: usize) -> u8 {
        if let Some(&slot) = self.reverse.get(&block) {
            return slot;
        }
        if self.palette.len() >= MAX_PALETTE_SIZE {
            self.compact_without(Some(overwriting));
        }
        if self.palette.len() >= MAX_PALETTE_SIZE {
            tracing::warn!(
                "chunk palette full after compaction; aliasing block {} to slot 0 ({:?})",
                block.0,
                self.palette[0]
            );
            return 0;
        }
        if self.palette.len() == self.capacity {
            self.capacity = (self.capacity * 2).min(MAX_PALETTE_SIZE);
            self.palette.reserve_exact(self.capacity - self.palette.len());
        }
        let slot = self.palette.len() as u8;
        self.palette.push(block);
        self.reverse.insert(block, slot);
        slot
    }

    /// Drops palette slots no voxel references and remaps the index volume.
    ///
    /// Returns the new palette length, which equals the number of distinct
    /// blocks present.
    pub fn compact(&mut self) -> usize {
        self.compact_without(None)
    }

    fn compact_without(&mut self, skipped: Option<usize>) -> usize {
        let mut usage = [0u32; MAX_PALETTE_SIZE];
        for (index, &slot) in self.indices.iter().enumerate() {
            if Some(index) != skipped {
                usage[slot as usize] += 1;
            }
        }

        let mut remap = [0u8; MAX_PALETTE_SIZE];
        let mut palette = Vec::with_capacity(self.palette.len());
        for (old, &block) in self.palette.iter().enumerate() {
            if usage[old] > 0 {
                remap[old] = palette.len() as u8;
                palette.push(block);
            }
        }
        if palette.len() == self.palette.len() {
            return palette.len();
        }

        for slot in &mut self.indices {
            *slot = remap[*slot as usize];
        }
        self.reverse = palette
            .iter()
            .enumerate()
            .map(|(slot, &block)| (block, slot as u8))
            .collect();
        self.capacity = palette.len().next_power_of_two().max(INITIAL_PALETTE_CAPACITY);
        self.palette = palette;
        self.palette.len()
    }

    /// Returns `true` if every voxel resolves to air.
    pub fn is_empty(&self) -> bool {
        match self.reverse.get(&BlockId::AIR) {
            None => false,
            Some(_) if self.palette.len() == 1 => true,
            Some(&air) => self.indices.iter().all(|&slot| slot == air),
        }
    }

    /// Number of palette entries.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Reserved palette slots.
    pub fn palette_capacity(&self) -> usize {
        self.capacity
    }

    /// The palette, slot-ordered.
    pub fn palette(&self) -> &[BlockId] {
        &self.palette
    }

    /// Iterates `(flat_index, block)` over every voxel.
    pub fn iter(&self) -> impl Iterator<Item = (usize, BlockId)> + '_ {
        self.indices
            .iter()
            .enumerate()
            .map(|(index, &slot)| (index, self.palette[slot as usize]))
    }

    /// Converts a flat index back to `(x, y, z)`.
    pub fn coords_of(&self, index: usize) -> (usize, usize, usize) {
        let s = self.size;
        (index % s, (index / s) % s, index / (s * s))
    }

    /// Approximate heap bytes used by voxel storage.
    pub fn storage_bytes(&self) -> usize {
        self.indices.len() + self.capacity * std::mem::size_of::<BlockId>()
    }

    /// Every index resolves to a live palette slot.
    pub fn validate(&self) -> bool {
        let len = self.palette.len();
        len <= MAX_PALETTE_SIZE && self.indices.iter().all(|&slot| (slot as usize) < len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STONE: BlockId = BlockId(1);
    const DIRT: BlockId = BlockId(2);

    #[test]
    fn test_new_chunk_is_air() {
        let chunk = ChunkData::new(16);
        assert_eq!(chunk.volume(), 4096);
        assert_eq!(chunk.get(3, 4, 5), BlockId::AIR);
        assert!(chunk.is_empty());
        assert_eq!(chunk.palette(), &[BlockId::AIR]);
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut chunk = ChunkData::new(32);
        assert!(chunk.set(0, 0, 0, STONE));
        assert!(chunk.set(31, 31, 31, DIRT));
        assert_eq!(chunk.get(0, 0, 0), STONE);
        assert_eq!(chunk.get(31, 31, 31), DIRT);
        assert_eq!(chunk.get(1, 0, 0), BlockId::AIR);
        assert!(!chunk.set(0, 0, 0, STONE));
    }

    #[test]
    fn test_out_of_bounds_reads_air_and_ignores_writes() {
        let mut chunk = ChunkData::new(16);
        chunk.fill(STONE);
        assert_eq!(chunk.get(-1, 0, 0), BlockId::AIR);
        assert_eq!(chunk.get(0, 16, 0), BlockId::AIR);
        assert!(!chunk.set(16, 0, 0, DIRT));
        assert_eq!(chunk.palette_len(), 1);
    }

    #[test]
    fn test_flat_index_layout() {
        let chunk = ChunkData::new(16);
        assert_eq!(chunk.index_of(1, 0, 0), Some(1));
        assert_eq!(chunk.index_of(0, 1, 0), Some(16));
        assert_eq!(chunk.index_of(0, 0, 1), Some(256));
        assert_eq!(chunk.coords_of(1 + 2 * 16 + 3 * 256), (1, 2, 3));
    }

    #[test]
    fn test_palette_capacity_doubles() {
        let mut chunk = ChunkData::new(16);
        assert_eq!(chunk.palette_capacity(), 4);
        for i in 1..=4u16 {
            chunk.set(i as i32, 0, 0, BlockId(i));
        }
        assert_eq!(chunk.palette_len(), 5);
        assert_eq!(chunk.palette_capacity(), 8);
        for i in 5..=200u16 {
            chunk.set((i % 16) as i32, (i / 16) as i32, 1, BlockId(i));
        }
        assert_eq!(chunk.palette_capacity(), 256);
    }

    #[test]
    fn test_compaction_on_full_palette() {
        let mut chunk = ChunkData::new(16);
        // Fill 255 distinct blocks into one voxel each, then overwrite them all.
        for i in 1..=255u16 {
            chunk.set((i % 16) as i32, (i / 16) as i32, 0, BlockId(i));
        }
        assert_eq!(chunk.palette_len(), 256);
        for i in 1..=255u16 {
            chunk.set((i % 16) as i32, (i / 16) as i32, 0, STONE);
        }
        assert_eq!(chunk.palette_len(), 256);

        chunk.set(5, 5, 5, BlockId(1000));
        assert_eq!(chunk.get(5, 5, 5), BlockId(1000));
        // air, stone, and the new block remain
        assert_eq!(chunk.palette_len(), 3);
        assert!(chunk.validate());
    }

    #[test]
    fn test_compact_counts_distinct_blocks() {
        let mut chunk = ChunkData::new(16);
        chunk.set(0, 0, 0, STONE);
        chunk.set(1, 0, 0, DIRT);
        chunk.set(0, 0, 0, BlockId::AIR);
        assert_eq!(chunk.palette_len(), 3);
        assert_eq!(chunk.compact(), 2);
        assert_eq!(chunk.get(1, 0, 0), DIRT);
        assert_eq!(chunk.get(0, 0, 0), BlockId::AIR);
    }

    #[test]
    fn test_palette_overflow_aliases_to_slot_zero() {
        let mut chunk = ChunkData::new(16);
        for i in 0..256u16 {
            let (x, y) = ((i % 16) as i32, (i / 16) as i32);
            chunk.set(x, y, 0, BlockId(i + 1));
        }
        // Every slot is referenced; air still fills the rest of the volume.
        assert_eq!(chunk.palette_len(), 256);
        chunk.set(0, 0, 5, BlockId(999));
        assert_eq!(chunk.palette_len(), 256);
        assert_eq!(chunk.get(0, 0, 5), chunk.palette()[0]);
        assert!(chunk.validate());
    }

    #[test]
    fn test_full_palette_reuses_slot_of_overwritten_voxel() {
        let mut chunk = ChunkData::new(16);
        for i in 1..=255u16 {
            chunk.set((i % 16) as i32, (i / 16) as i32, 0, BlockId(i));
        }
        assert_eq!(chunk.palette_len(), 256);

        // (1, 0, 0) holds the only BlockId(1), so its slot frees up.
        assert!(chunk.set(1, 0, 0, BlockId(1000)));
        assert_eq!(chunk.get(1, 0, 0), BlockId(1000));
        assert_eq!(chunk.get(2, 0, 0), BlockId(2));
        assert_eq!(chunk.get(5, 5, 5), BlockId::AIR);
        assert_eq!(chunk.palette_len(), 256);
        assert!(!chunk.palette().contains(&BlockId(1)));
        assert!(chunk.validate());
    }

    #[test]
    fn test_is_empty_after_clearing() {
        let mut chunk = ChunkData::new(16);
        chunk.set(2, 2, 2, STONE);
        assert!(!chunk.is_empty());
        chunk.set(2, 2, 2, BlockId::AIR);
        assert!(chunk.is_empty());
        chunk.fill(STONE);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_single_air_pocket_palette() {
        let mut chunk = ChunkData::new(16);
        chunk.fill(STONE);
        chunk.set(8, 8, 8, BlockId::AIR);
        assert_eq!(chunk.palette_len(), 2);
    }

    #[test]
    fn test_storage_smaller_than_direct() {
        let mut chunk = ChunkData::new(32);
        chunk.fill(STONE);
        chunk.set(0, 0, 0, DIRT);
        let direct = chunk.volume() * 2;
        assert!(chunk.storage_bytes() * 2 <= direct + 64);
    }
}
