//! Cross-chunk light exchange through border layers.
//!
//! When a chunk is lit, the outermost voxel layer of every already-lit
//! neighbour facing it is copied into a [`BorderLayer`] and pulled into the
//! chunk's own face. The pulled-in voxels then seed the regular flood, so
//! light crosses boundaries no matter which side was generated first.

use strata_voxel::{BlockRegistry, Chunk, ChunkData, Direction, LightChannel, LightVolume, VoxelLight};

use crate::propagation::transfer;

/// Light values along one chunk face, `size × size` entries indexed `a * size + b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BorderLayer {
    size: usize,
    values: Vec<VoxelLight>,
}

impl BorderLayer {
    /// Copies the layer of `chunk` on its `face` side.
    pub fn extract(chunk: &Chunk, face: Direction) -> Self {
        let size = chunk.size();
        let light = chunk.light();
        let mut values = Vec::with_capacity(size * size);
        for a in 0..size {
            for b in 0..size {
                let (x, y, z) = face_coords(size, face, a, b);
                values.push(light.get(x, y, z));
            }
        }
        Self { size, values }
    }

    /// Side length of the face.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Light at face coordinates `(a, b)`.
    pub fn get(&self, a: usize, b: usize) -> VoxelLight {
        self.values[a * self.size + b]
    }

    /// Returns `true` if any voxel differs from `other`.
    pub fn changed(&self, other: &BorderLayer) -> bool {
        self.values != other.values
    }
}

/// Maps `(a, b)` on the `face` side of a chunk to local `(x, y, z)`.
pub fn face_coords(size: usize, face: Direction, a: usize, b: usize) -> (i32, i32, i32) {
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

/// Pulls a neighbour's border into this chunk's `face` side.
///
/// `layer` is the neighbour's layer facing back at us. Only `channels` are
/// transferred. Returns the local coordinates whose light increased.
pub fn pull_in(
    data: &ChunkData,
    light: &mut LightVolume,
    registry: &BlockRegistry,
    face: Direction,
    layer: &BorderLayer,
    channels: &[LightChannel],
) -> Vec<(i32, i32, i32)> {
    let size = layer.size();
    // Light entering through our `face` travels the opposite way.
    let travel = face.opposite();
    let mut raised = Vec::new();

    for a in 0..size {
        for b in 0..size {
            let (x, y, z) = face_coords(size, face, a, b);
            let block = data.get(x, y, z);
            if registry.is_opaque(block) {
                continue;
            }
            let incoming = layer.get(a, b);
            let mut changed = false;
            for &channel in channels {
                let level = transfer(registry, channel, travel, channel.read(incoming), block);
                if level > light.channel(channel, x, y, z) {
                    light.set_channel(channel, x, y, z, level);
                    changed = true;
                }
            }
            if changed {
                raised.push((x, y, z));
            }
        }
    }
    raised
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
