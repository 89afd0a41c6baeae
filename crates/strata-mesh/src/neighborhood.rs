//! Owned snapshots of a chunk and the boundary layers of its six neighbours.
//!
//! [`ChunkSnapshot`] copies everything the mesher needs while holding one
//! chunk lock at a time, so meshing itself runs without touching the world.
//! Only the single layer of each neighbour that touches the centre chunk is
//! stored; a missing neighbour is recorded as absent and its faces are
//! treated as exposed.

use strata_voxel::{BlockId, ChunkData, ChunkManager, ChunkPos, Direction, LightVolume, MAX_LIGHT, VoxelLight};

/// One `size × size` layer of blocks and light from a face neighbour.
///
/// Stored with `a` (the lower of the two remaining axes) varying slowest.
#[derive(Clone, Debug)]
pub struct BoundarySlice {
    size: usize,
    blocks: Vec<BlockId>,
    light: Vec<VoxelLight>,
}

impl BoundarySlice {
    /// Copies the layer of `data`/`light` on the `face` side.
    pub fn extract(data: &ChunkData, light: &LightVolume, face: Direction) -> Self {
        let size = data.size();
        let mut blocks = Vec::with_capacity(size * size);
        let mut values = Vec::with_capacity(size * size);
        for a in 0..size {
            for b in 0..size {
                let (x, y, z) = layer_coords(size, face, a, b);
                blocks.push(data.get(x, y, z));
                values.push(light.get(x, y, z));
            }
        }
        Self {
            size,
            blocks,
            light: values,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at slice coordinates `(a, b)`.
    pub fn block(&self, a: usize, b: usize) -> BlockId {
        self.blocks[a * self.size + b]
    }

    /// Light at slice coordinates `(a, b)`.
    pub fn light(&self, a: usize, b: usize) -> VoxelLight {
        self.light[a * self.size + b]
    }
}

/// Local coordinates of `(a, b)` on the `face` side of a chunk.
fn layer_coords(size: usize, face: Direction, a: usize, b: usize) -> (i32, i32, i32) {
    let edge = size as i32 - 1;
    let (a, b) = (a as i32, b as i32);
    match face {
        Direction::PosX => (edge, a, b),
        Direction::NegX => (0, a, b),
        Direction::PosY => (a, edge, b),
        Direction::NegY => (a, 0, b),
        Direction::PosZ => (a, b, edge),
        Direction::NegZ => (a, b, 0),
    }
}

/// What lies on the far side of a voxel face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighbor {
    /// A loaded voxel.
    Voxel(BlockId, VoxelLight),
    /// The neighbouring chunk is not available.
    Missing,
}

/// A self-contained copy of one chunk plus its face neighbours' boundaries.
#[derive(Clone, Debug)]
pub struct ChunkSnapshot {
    pos: ChunkPos,
    version: u64,
    data: ChunkData,
    light: LightVolume,
    /// Indexed by [`Direction::index`].
    faces: [Option<BoundarySlice>; 6],
}

impl ChunkSnapshot {
    /// A snapshot with no neighbours loaded.
    pub fn isolated(pos: ChunkPos, version: u64, data: ChunkData, light: LightVolume) -> Self {
        Self {
            pos,
            version,
            data,
            light,
            faces: Default::default(),
        }
    }

    /// Copies a generated chunk and the touching layers of its generated
    /// neighbours. Returns `None` if the chunk is gone or not generated yet.
    pub fn capture(manager: &ChunkManager, pos: ChunkPos) -> Option<Self> {
        let mut snapshot = {
            let handle = manager.get_chunk(pos)?;
            let chunk = handle.read();
            if !chunk.is_generated() {
                return None;
            }
            Self::isolated(pos, chunk.version(), chunk.data().clone(), chunk.light().clone())
        };

        for dir in Direction::ALL {
            let Some(handle) = manager.get_chunk(pos.offset(dir)) else {
                continue;
            };
            let neighbor = handle.read();
            if neighbor.is_generated() {
                snapshot.faces[dir.index()] =
                    Some(BoundarySlice::extract(neighbor.data(), neighbor.light(), dir.opposite()));
            }
        }
        Some(snapshot)
    }

    /// Attaches a neighbour's full data on the `dir` side.
    pub fn set_neighbor(&mut self, dir: Direction, data: &ChunkData, light: &LightVolume) {
        self.faces[dir.index()] = Some(BoundarySlice::extract(data, light, dir.opposite()));
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Chunk version the snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    pub fn light(&self) -> &LightVolume {
        &self.light
    }

    /// Whether the neighbour on the `dir` side was captured.
    pub fn has_neighbor(&self, dir: Direction) -> bool {
        self.faces[dir.index()].is_some()
    }

    /// The voxel adjacent to local `(x, y, z)` in `dir`.
    ///
    /// `(x, y, z)` must be inside the chunk; the neighbour may be one step
    /// outside it on a single axis.
    pub fn neighbor(&self, x: i32, y: i32, z: i32, dir: Direction) -> Neighbor {
        let (dx, dy, dz) = dir.offset();
        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
        let s = self.size() as i32;
        if (0..s).contains(&nx) && (0..s).contains(&ny) && (0..s).contains(&nz) {
            return Neighbor::Voxel(self.data.get(nx, ny, nz), self.light.get(nx, ny, nz));
        }
        let Some(slice) = &self.faces[dir.index()] else {
            return Neighbor::Missing;
        };
        // The slice was taken from the neighbour's opposite face, whose two
        // free axes are the same as ours.
        let (a, b) = match dir {
            Direction::PosX | Direction::NegX => (y, z),
            Direction::PosY | Direction::NegY => (x, z),
            Direction::PosZ | Direction::NegZ => (x, y),
        };
        let (a, b) = (a as usize, b as usize);
        Neighbor::Voxel(slice.block(a, b), slice.light(a, b))
    }
}

impl Neighbor {
    /// Light reaching a face from this side. Missing chunks count as open sky.
    pub fn light_level(self) -> u8 {
        match self {
            Neighbor::Voxel(_, light) => light.max_level(),
            Neighbor::Missing => MAX_LIGHT,
        }
    }
}
