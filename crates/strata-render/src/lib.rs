//! Chunk rendering: camera and frustum culling, the backend seam that owns
//! GPU state, and the per-frame chunk renderer consuming finished meshes.

pub mod backend;
pub mod camera;
pub mod chunk_pipeline;
pub mod frustum;
pub mod gpu_chunk_mesh;
pub mod renderer;

use strata_voxel::ChunkPos;
use thiserror::Error;

pub use backend::{HeadlessBackend, HeadlessMesh, RenderBackend};
pub use camera::{Camera, CameraUniform};
pub use chunk_pipeline::{CHUNK_SHADER_SOURCE, ChunkPipeline};
pub use frustum::{Aabb, CameraView, Frustum, ViewVolume};
pub use gpu_chunk_mesh::{GpuChunkMesh, WgpuBackend};
pub use renderer::{ChunkRenderer, FrameStats, RenderConfig, UploadOutcome};

/// Errors raised on the render side of the mesh hand-off.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The backend's shader expects a different vertex stride than the mesher emits.
    #[error("vertex layout mismatch: mesher emits {expected}-byte vertices, backend expects {found}")]
    LayoutMismatch { expected: u64, found: u64 },
    /// A mesh's vertex stream is not made of whole faces.
    #[error("mesh for chunk {0} is malformed")]
    MalformedMesh(ChunkPos),
    /// The backend could not take the mesh.
    #[error("upload of chunk {pos} failed: {reason}")]
    Upload { pos: ChunkPos, reason: String },
}
