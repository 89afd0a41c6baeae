//! The seam between the chunk renderer and whatever owns GPU state.
//!
//! A [`RenderBackend`] is only ever driven from the render thread. Meshes
//! arrive as CPU vertex streams; the backend turns them into resident handles
//! and draws them. [`HeadlessBackend`] keeps the bookkeeping without a device.

use strata_mesh::{ChunkMesh, VERTEX_STRIDE};
use strata_voxel::ChunkPos;

use crate::RenderError;

/// GPU-side operations the chunk renderer needs.
pub trait RenderBackend {
    /// A mesh resident on the backend.
    type Mesh;

    /// Byte stride of the vertex layout the backend's shader consumes.
    fn vertex_stride(&self) -> u64;

    /// Copies `mesh` into backend memory.
    fn upload(&mut self, pos: ChunkPos, mesh: &ChunkMesh) -> Result<Self::Mesh, RenderError>;

    /// Frees a resident mesh immediately.
    fn release(&mut self, mesh: Self::Mesh);

    /// Records one draw call for a resident mesh.
    fn draw(&mut self, mesh: &Self::Mesh);
}

/// Handle to a mesh held by [`HeadlessBackend`].
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessMesh {
    pub pos: ChunkPos,
    pub vertex_count: u32,
    pub bytes: u64,
}

/// A device-free backend that records what a GPU would have been asked to do.
#[derive(Debug)]
pub struct HeadlessBackend {
    stride: u64,
    resident_bytes: u64,
    resident_meshes: usize,
    uploads: u64,
    releases: u64,
    draw_calls: u64,
    drawn_vertices: u64,
    fail_uploads: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_stride(VERTEX_STRIDE as u64)
    }

    /// A backend whose shader expects `stride`-byte vertices.
    pub fn with_stride(stride: u64) -> Self {
        Self {
            stride,
            resident_bytes: 0,
            resident_meshes: 0,
            uploads: 0,
            releases: 0,
            draw_calls: 0,
            drawn_vertices: 0,
            fail_uploads: false,
        }
    }

    /// Makes every following upload fail, as a device-lost would.
    pub fn set_fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    /// Bytes currently held by resident meshes.
    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    pub fn resident_meshes(&self) -> usize {
        self.resident_meshes
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn drawn_vertices(&self) -> u64 {
        self.drawn_vertices
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for HeadlessBackend {
    type Mesh = HeadlessMesh;

    fn vertex_stride(&self) -> u64 {
        self.stride
    }

    fn upload(&mut self, pos: ChunkPos, mesh: &ChunkMesh) -> Result<HeadlessMesh, RenderError> {
        if self.fail_uploads {
            return Err(RenderError::Upload {
                pos,
                reason: "uploads disabled".to_string(),
            });
        }
        let bytes = mesh.as_bytes().len() as u64;
        self.resident_bytes += bytes;
        self.resident_meshes += 1;
        self.uploads += 1;
        Ok(HeadlessMesh {
            pos,
            vertex_count: mesh.vertex_count() as u32,
            bytes,
        })
    }

    fn release(&mut self, mesh: HeadlessMesh) {
        self.resident_bytes = self.resident_bytes.saturating_sub(mesh.bytes);
        self.resident_meshes = self.resident_meshes.saturating_sub(1);
        self.releases += 1;
    }

    fn draw(&mut self, mesh: &HeadlessMesh) {
        self.draw_calls += 1;
        self.drawn_vertices += u64::from(mesh.vertex_count);
    }
}
