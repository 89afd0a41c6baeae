//! Voxel storage with palette compression, block registry, regions, and chunk lifecycle management.

pub mod chunk;
pub mod chunk_api;
pub mod chunk_loading;
pub mod chunk_manager;
pub mod coords;
pub mod generation_queue;
pub mod light;
pub mod region;
pub mod registry;

pub use chunk::{CHUNK_SIZE, ChunkData, MAX_PALETTE_SIZE, SUPPORTED_CHUNK_SIZES};
pub use chunk_api::{Chunk, MESH_DIRTY, NeighborLinks};
pub use chunk_loading::{
    ChunkLoadConfig, ChunkLoadError, ChunkLoadTickResult, ChunkLoader, MIN_UNLOAD_MARGIN,
};
pub use chunk_manager::{ChunkHandle, ChunkManager};
pub use coords::{BlockPos, ChunkPos, Direction, RegionPos};
pub use generation_queue::GenerationQueue;
pub use light::{LightChannel, LightVolume, MAX_LIGHT, VoxelLight};
pub use region::{Region, RegionBounds};
pub use registry::{
    Block, BlockId, BlockIdentifier, BlockProperties, BlockRegistry, BlockTextures, RegistryError,
};
