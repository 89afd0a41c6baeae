//! GPU-resident chunk meshes and the wgpu implementation of
//! [`RenderBackend`].

use strata_mesh::{ChunkMesh, VERTEX_STRIDE};
use strata_voxel::ChunkPos;
use wgpu::util::DeviceExt;

use crate::RenderError;
use crate::backend::RenderBackend;

/// A chunk mesh that has been uploaded to the GPU.
pub struct GpuChunkMesh {
    pub vertex_buffer: wgpu::Buffer,
    /// Number of vertices (used in `draw`).
    pub vertex_count: u32,
    vertex_buffer_size: u64,
}

impl GpuChunkMesh {
    /// Uploads the interleaved vertex stream into a new vertex buffer.
    pub fn upload(device: &wgpu::Device, mesh: &ChunkMesh) -> Self {
        let bytes = mesh.as_bytes();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("chunk_vertex_buffer"),
            contents: bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            vertex_buffer,
            vertex_count: mesh.vertex_count() as u32,
            vertex_buffer_size: bytes.len() as u64,
        }
    }

    /// Size of the vertex buffer in bytes.
    pub fn vertex_buffer_size(&self) -> u64 {
        self.vertex_buffer_size
    }

    /// Binds the buffer and issues a non-indexed draw.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

/// Draws recorded during a frame, replayed into a render pass.
struct RecordedDraw {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// [`RenderBackend`] over a wgpu device. Draw calls are recorded and then
/// replayed into a render pass with [`WgpuBackend::encode`].
pub struct WgpuBackend {
    device: wgpu::Device,
    draws: Vec<RecordedDraw>,
    resident_bytes: u64,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            draws: Vec::new(),
            resident_bytes: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Bytes of vertex data currently on the GPU.
    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    /// Draws recorded since the last [`encode`](Self::encode).
    pub fn recorded_draws(&self) -> usize {
        self.draws.len()
    }

    /// Replays the recorded draws into `render_pass`, whose pipeline and
    /// bind groups must already be set, and clears the list.
    pub fn encode(&mut self, render_pass: &mut wgpu::RenderPass<'_>) {
        for draw in self.draws.drain(..) {
            render_pass.set_vertex_buffer(0, draw.buffer.slice(..));
            render_pass.draw(0..draw.vertex_count, 0..1);
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Mesh = GpuChunkMesh;

    fn vertex_stride(&self) -> u64 {
        VERTEX_STRIDE as u64
    }

    fn upload(&mut self, pos: ChunkPos, mesh: &ChunkMesh) -> Result<GpuChunkMesh, RenderError> {
        if mesh.is_empty() {
            return Err(RenderError::Upload {
                pos,
                reason: "empty mesh".to_string(),
            });
        }
        let uploaded = GpuChunkMesh::upload(&self.device, mesh);
        self.resident_bytes += uploaded.vertex_buffer_size;
        Ok(uploaded)
    }

    fn release(&mut self, mesh: GpuChunkMesh) {
        self.resident_bytes = self.resident_bytes.saturating_sub(mesh.vertex_buffer_size);
        mesh.vertex_buffer.destroy();
    }

    fn draw(&mut self, mesh: &GpuChunkMesh) {
        self.draws.push(RecordedDraw {
            buffer: mesh.vertex_buffer.clone(),
            vertex_count: mesh.vertex_count,
        });
    }
}

#[cfg(test)]
pub(crate) fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use strata_voxel::Direction;

    use super::*;

    fn faces(count: usize) -> ChunkMesh {
        let mut mesh = ChunkMesh::new();
        for i in 0..count {
            mesh.push_face(Direction::PosY, [i as f32, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0], 1.0);
        }
        mesh
    }

    #[test]
    fn test_upload_sizes_buffer_to_vertices() {
        let Some((device, _queue)) = test_device() else {
            return; // graceful skip when no GPU
        };
        let gpu_mesh = GpuChunkMesh::upload(&device, &faces(3));
        assert_eq!(gpu_mesh.vertex_count, 18);
        assert_eq!(gpu_mesh.vertex_buffer_size(), 18 * VERTEX_STRIDE as u64);
    }

    #[test]
    fn test_backend_tracks_resident_bytes() {
        let Some((device, _queue)) = test_device() else {
            return;
        };
        let mut backend = WgpuBackend::new(device);
        let mesh = backend.upload(ChunkPos::new(0, 0, 0), &faces(2)).unwrap();
        assert_eq!(backend.resident_bytes(), 12 * VERTEX_STRIDE as u64);
        backend.draw(&mesh);
        assert_eq!(backend.recorded_draws(), 1);
        backend.release(mesh);
        assert_eq!(backend.resident_bytes(), 0);

        assert!(backend.upload(ChunkPos::new(0, 0, 0), &ChunkMesh::new()).is_err());
    }
}
