//! World-space access to block and light data across chunk boundaries.
//!
//! Propagation works in world coordinates and resolves the owning chunk
//! through the [`ChunkManager`] on demand. Each access takes and releases the
//! chunk's lock, so a propagation pass never holds two chunk locks at once.
//! Chunks that are not loaded or not yet generated read as absent, which stops
//! propagation at that boundary.

use rustc_hash::{FxHashMap, FxHashSet};
use strata_voxel::{
    BlockId, BlockPos, ChunkHandle, ChunkManager, ChunkPos, LightChannel, MESH_DIRTY, VoxelLight,
};

/// A transient propagation-queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightNode {
    /// Owning chunk.
    pub chunk: ChunkPos,
    /// Local coordinates inside `chunk`.
    pub local: (u8, u8, u8),
    /// Light level at this node.
    pub level: u8,
}

impl LightNode {
    /// Node for a world position.
    pub fn at(pos: BlockPos, level: u8, chunk_size: usize) -> Self {
        let (chunk, (x, y, z)) = pos.to_chunk_local(chunk_size);
        Self {
            chunk,
            local: (x as u8, y as u8, z as u8),
            level,
        }
    }

    /// World position of this node.
    pub fn world(&self, chunk_size: usize) -> BlockPos {
        let (x, y, z) = self.local;
        BlockPos::from_chunk_local(self.chunk, (x as usize, y as usize, z as usize), chunk_size)
    }
}

/// Caching, lock-per-access view over the manager's chunks.
pub struct ChunkCursor<'a> {
    manager: &'a ChunkManager,
    chunk_size: usize,
    handles: FxHashMap<ChunkPos, Option<ChunkHandle>>,
    changed: FxHashSet<ChunkPos>,
}

impl<'a> ChunkCursor<'a> {
    /// Creates a cursor over `manager`.
    pub fn new(manager: &'a ChunkManager) -> Self {
        Self {
            manager,
            chunk_size: manager.chunk_size(),
            handles: FxHashMap::default(),
            changed: FxHashSet::default(),
        }
    }

    /// Side length of chunks.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The manager this cursor reads through.
    pub fn manager(&self) -> &'a ChunkManager {
        self.manager
    }

    /// Handle of a generated chunk, cached for the cursor's lifetime.
    pub fn chunk(&mut self, pos: ChunkPos) -> Option<ChunkHandle> {
        let manager = self.manager;
        self.handles
            .entry(pos)
            .or_insert_with(|| manager.get_chunk(pos).filter(|handle| handle.read().is_generated()))
            .clone()
    }

    fn locate(&mut self, pos: BlockPos) -> Option<(ChunkHandle, ChunkPos, i32, i32, i32)> {
        let (chunk, (x, y, z)) = pos.to_chunk_local(self.chunk_size);
        let handle = self.chunk(chunk)?;
        Some((handle, chunk, x as i32, y as i32, z as i32))
    }

    /// Block at `pos`, or `None` if its chunk is absent.
    pub fn block(&mut self, pos: BlockPos) -> Option<BlockId> {
        let (handle, _, x, y, z) = self.locate(pos)?;
        let block = handle.read().get(x, y, z);
        Some(block)
    }

    /// Block and light at `pos`, or `None` if its chunk is absent.
    pub fn voxel(&mut self, pos: BlockPos) -> Option<(BlockId, VoxelLight)> {
        let (handle, _, x, y, z) = self.locate(pos)?;
        let chunk = handle.read();
        Some((chunk.get(x, y, z), chunk.light().get(x, y, z)))
    }

    /// One light channel at `pos`, or `None` if its chunk is absent.
    pub fn level(&mut self, pos: BlockPos, channel: LightChannel) -> Option<u8> {
        let (handle, _, x, y, z) = self.locate(pos)?;
        let level = handle.read().light().channel(channel, x, y, z);
        Some(level)
    }

    /// Raises `channel` at `pos` to `level` if it is currently lower.
    ///
    /// Returns `true` if the stored value changed.
    pub fn raise(&mut self, pos: BlockPos, channel: LightChannel, level: u8) -> bool {
        let Some((handle, chunk_pos, x, y, z)) = self.locate(pos) else {
            return false;
        };
        {
            let mut chunk = handle.write();
            if chunk.light().channel(channel, x, y, z) >= level {
                return false;
            }
            chunk.light_mut().set_channel(channel, x, y, z, level);
            chunk.mark_dirty(MESH_DIRTY);
        }
        self.changed.insert(chunk_pos);
        true
    }

    /// Overwrites `channel` at `pos`, returning the previous level.
    pub fn replace(&mut self, pos: BlockPos, channel: LightChannel, level: u8) -> Option<u8> {
        let (handle, chunk_pos, x, y, z) = self.locate(pos)?;
        let previous = {
            let mut chunk = handle.write();
            let previous = chunk.light().channel(channel, x, y, z);
            if previous != level {
                chunk.light_mut().set_channel(channel, x, y, z, level);
                chunk.mark_dirty(MESH_DIRTY);
            }
            previous
        };
        if previous != level {
            self.changed.insert(chunk_pos);
        }
        Some(previous)
    }

    /// Records that a chunk's light was modified outside the cursor.
    pub fn note_changed(&mut self, pos: ChunkPos) {
        self.changed.insert(pos);
    }

    /// Chunks whose light was modified through this cursor.
    pub fn into_changed(self) -> FxHashSet<ChunkPos> {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::{ChunkData, ChunkLoadConfig};

    use super::*;

    fn manager() -> ChunkManager {
        let config = ChunkLoadConfig {
            height_chunks: 1,
            ..ChunkLoadConfig::default()
        };
        ChunkManager::new(16, 8, config).unwrap()
    }

    #[test]
    fn test_node_world_roundtrip() {
        let pos = BlockPos::new(-3, 7, 40);
        let node = LightNode::at(pos, 9, 16);
        assert_eq!(node.chunk, ChunkPos::new(-1, 0, 2));
        assert_eq!(node.local, (13, 7, 8));
        assert_eq!(node.world(16), pos);
    }

    #[test]
    fn test_ungenerated_chunks_are_absent() {
        let manager = manager();
        manager.get_or_create_chunk(ChunkPos::new(0, 0, 0));
        let mut cursor = ChunkCursor::new(&manager);
        assert_eq!(cursor.block(BlockPos::new(1, 1, 1)), None);
        assert!(!cursor.raise(BlockPos::new(1, 1, 1), LightChannel::Block, 5));
    }

    #[test]
    fn test_raise_only_increases_and_tracks_changes() {
        let manager = manager();
        let handle = manager.get_or_create_chunk(ChunkPos::new(0, 0, 0));
        handle.write().populate(ChunkData::new(16));
        handle.write().clear_dirty(MESH_DIRTY);

        let mut cursor = ChunkCursor::new(&manager);
        let pos = BlockPos::new(2, 3, 4);
        assert!(cursor.raise(pos, LightChannel::Block, 7));
        assert!(!cursor.raise(pos, LightChannel::Block, 5));
        assert_eq!(cursor.level(pos, LightChannel::Block), Some(7));
        assert_eq!(cursor.replace(pos, LightChannel::Block, 2), Some(7));
        assert_eq!(cursor.level(pos, LightChannel::Block), Some(2));

        let changed = cursor.into_changed();
        assert!(changed.contains(&ChunkPos::new(0, 0, 0)));
        assert!(handle.read().is_dirty(MESH_DIRTY));
    }
}
