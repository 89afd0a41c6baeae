//! Chunk meshing: face culling against neighbour snapshots, the vertex wire
//! format shared with the shader, texture atlas lookup, and the background
//! meshing pipeline that feeds the render thread.

pub mod atlas;
pub mod face_direction;
pub mod mesher;
pub mod neighborhood;
pub mod pipeline;
pub mod vertex;
pub mod vertex_format;

use thiserror::Error;

pub use atlas::{GridAtlas, MISSING_TILE, TextureAtlas};
pub use face_direction::{TRIANGLE_CORNERS, face_corners, face_shade, face_texture};
pub use mesher::{AMBIENT_FLOOR, ChunkMesh, build_mesh, face_brightness};
pub use neighborhood::{BoundarySlice, ChunkSnapshot, Neighbor};
pub use pipeline::{MeshUpload, MeshingConfig, MeshingPipeline, MeshingStats, UploadQueue};
pub use vertex::{ChunkVertex, FLOATS_PER_VERTEX, VERTEX_STRIDE, VERTICES_PER_FACE};
pub use vertex_format::{CHUNK_VERTEX_ATTRIBUTES, CHUNK_VERTEX_LAYOUT, chunk_vertex_buffer_layout};

/// Errors raised by the meshing pipeline.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A worker thread could not be started.
    #[error("failed to spawn meshing worker: {0}")]
    Spawn(#[from] std::io::Error),
}
