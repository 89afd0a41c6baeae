//! Heightmap terrain: fills chunk columns bottom-up with stone, dirt, and grass.

use strata_voxel::{BlockId, BlockRegistry, ChunkData, ChunkPos};

use crate::GenerationError;
use crate::heightmap::{HeightmapParams, HeightmapSampler};

/// Produces block data for a chunk position.
///
/// Implementations must be deterministic for a given position and seed.
pub trait TerrainSource: Send + Sync {
    /// Generates the blocks of the chunk at `pos` with side length `size`.
    fn generate(&self, pos: ChunkPos, size: usize) -> Result<ChunkData, GenerationError>;
}

/// Block IDs used by the layered fill rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainBlocks {
    /// Deep material.
    pub stone: BlockId,
    /// Near-surface material.
    pub dirt: BlockId,
    /// Surface material.
    pub grass: BlockId,
}

impl TerrainBlocks {
    /// Resolves `stone`, `dirt`, and `grass` from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MissingBlock`] naming the first block not
    /// registered.
    pub fn from_registry(registry: &BlockRegistry) -> Result<Self, GenerationError> {
        let lookup = |name: &str| {
            registry
                .lookup(name)
                .ok_or_else(|| GenerationError::MissingBlock(name.to_string()))
        };
        Ok(Self {
            stone: lookup("stone")?,
            dirt: lookup("dirt")?,
            grass: lookup("grass")?,
        })
    }
}

/// Terrain shaping parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainConfig {
    /// Noise parameters for the surface height.
    pub heightmap: HeightmapParams,
    /// Thickness of the dirt layer below the grass.
    pub dirt_depth: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: HeightmapParams::default(),
            dirt_depth: 3,
        }
    }
}

/// Deterministic heightmap terrain.
pub struct HeightmapTerrain {
    sampler: HeightmapSampler,
    blocks: TerrainBlocks,
    dirt_depth: i32,
}

impl HeightmapTerrain {
    /// Creates a generator.
    pub fn new(config: TerrainConfig, blocks: TerrainBlocks) -> Self {
        Self {
            sampler: HeightmapSampler::new(config.heightmap),
            blocks,
            dirt_depth: config.dirt_depth.max(0),
        }
    }

    /// Block at world height `y` in a column whose surface is at `surface`.
    pub fn layer_at(&self, y: i32, surface: i32) -> BlockId {
        if y > surface {
            BlockId::AIR
        } else if y == surface {
            self.blocks.grass
        } else if y >= surface - self.dirt_depth {
            self.blocks.dirt
        } else {
            self.blocks.stone
        }
    }

    /// Surface height of the world column `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.sampler.surface_height(x, z)
    }
}

impl TerrainSource for HeightmapTerrain {
    fn generate(&self, pos: ChunkPos, size: usize) -> Result<ChunkData, GenerationError> {
        let mut data = ChunkData::new(size);
        let s = size as i32;
        let origin = pos.world_origin(size);

        for lz in 0..s {
            for lx in 0..s {
                let surface = self.sampler.surface_height(origin.x + lx, origin.z + lz);
                if surface < origin.y {
                    continue;
                }
                for ly in 0..s {
                    let block = self.layer_at(origin.y + ly, surface);
                    if block.is_air() {
                        break;
                    }
                    data.set(lx, ly, lz, block);
                }
            }
        }
        Ok(data)
    }
}
