//! Integer coordinate types for chunks, regions, and world blocks.

use serde::{Deserialize, Serialize};

/// Position of a chunk in chunk-space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    /// East-west chunk coordinate.
    pub x: i32,
    /// Vertical chunk layer.
    pub y: i32,
    /// North-south chunk coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Creates a new chunk position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent chunk position in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared horizontal distance (in chunks) to the column `(cx, cz)`.
    pub fn column_distance_sq(self, cx: i32, cz: i32) -> i64 {
        let dx = (self.x - cx) as i64;
        let dz = (self.z - cz) as i64;
        dx * dx + dz * dz
    }

    /// The region containing this chunk for a region edge of `region_size` chunks.
    pub fn region(self, region_size: i32) -> RegionPos {
        RegionPos {
            x: self.x.div_euclid(region_size),
            z: self.z.div_euclid(region_size),
        }
    }

    /// World-space coordinates of this chunk's minimum corner.
    pub fn world_origin(self, chunk_size: usize) -> BlockPos {
        let s = chunk_size as i32;
        BlockPos::new(self.x * s, self.y * s, self.z * s)
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Position of a region in region-space (horizontal only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionPos {
    /// East-west region coordinate.
    pub x: i32,
    /// North-south region coordinate.
    pub z: i32,
}

/// Absolute position of a block in world-space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent block position in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Splits into the owning chunk and the local coordinates inside it.
    pub fn to_chunk_local(self, chunk_size: usize) -> (ChunkPos, (usize, usize, usize)) {
        let s = chunk_size as i32;
        let chunk = ChunkPos::new(self.x.div_euclid(s), self.y.div_euclid(s), self.z.div_euclid(s));
        let local = (
            self.x.rem_euclid(s) as usize,
            self.y.rem_euclid(s) as usize,
            self.z.rem_euclid(s) as usize,
        );
        (chunk, local)
    }

    /// Rebuilds a world position from a chunk and local coordinates.
    pub fn from_chunk_local(chunk: ChunkPos, local: (usize, usize, usize), chunk_size: usize) -> Self {
        let origin = chunk.world_origin(chunk_size);
        Self::new(
            origin.x + local.0 as i32,
            origin.y + local.1 as i32,
            origin.z + local.2 as i32,
        )
    }
}

/// One of the six axis-aligned directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +X (east).
    PosX,
    /// -X (west).
    NegX,
    /// +Y (up).
    PosY,
    /// -Y (down).
    NegY,
    /// +Z (south).
    PosZ,
    /// -Z (north).
    NegZ,
}

impl Direction {
    /// All six directions, in bit order.
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    /// The four horizontal directions.
    pub const LATERAL: [Direction; 4] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosZ,
        Direction::NegZ,
    ];

    /// Unit offset `(dx, dy, dz)`.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
        }
    }

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
        }
    }

    /// Index in [`Direction::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Direction::PosX => 0,
            Direction::NegX => 1,
            Direction::PosY => 2,
            Direction::NegY => 3,
            Direction::PosZ => 4,
            Direction::NegZ => 5,
        }
    }

    /// Single-bit mask for neighbour bitsets.
    pub const fn bit(self) -> u8 {
        1 << self.index()
    }

    /// Compass name used for face shading and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Direction::PosX => "east",
            Direction::NegX => "west",
            Direction::PosY => "up",
            Direction::NegY => "down",
            Direction::PosZ => "south",
            Direction::NegZ => "north",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_block_maps_to_negative_chunk() {
        let (chunk, local) = BlockPos::new(-1, -17, 33).to_chunk_local(16);
        assert_eq!(chunk, ChunkPos::new(-1, -2, 2));
        assert_eq!(local, (15, 15, 1));
    }

    #[test]
    fn test_chunk_local_roundtrip() {
        let pos = BlockPos::new(-45, 70, 12);
        let (chunk, local) = pos.to_chunk_local(32);
        assert_eq!(BlockPos::from_chunk_local(chunk, local, 32), pos);
    }

    #[test]
    fn test_region_of_negative_chunk() {
        assert_eq!(ChunkPos::new(-1, 0, 15).region(16), RegionPos { x: -1, z: 0 });
        assert_eq!(ChunkPos::new(16, 3, -16).region(16), RegionPos { x: 1, z: -1 });
    }

    #[test]
    fn test_direction_opposites_and_bits() {
        let mut mask = 0u8;
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dx, dy, dz) = dir.offset();
            let (ox, oy, oz) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy, dz + oz), (0, 0, 0));
            mask |= dir.bit();
        }
        assert_eq!(mask, 0b11_1111);
    }

    #[test]
    fn test_column_distance() {
        let pos = ChunkPos::new(3, 7, -4);
        assert_eq!(pos.column_distance_sq(0, 0), 25);
    }
}
