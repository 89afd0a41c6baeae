//! The chunk vertex wire format shared by the mesher and the renderer.
//!
//! Every vertex is six little-endian `f32`s:
//!
//! | Floats | Bytes   | Field      |
//! |--------|---------|------------|
//! | 0..3   | 0..12   | position   |
//! | 3..5   | 12..20  | uv         |
//! | 5      | 20..24  | brightness |
//!
//! Producers and consumers must size buffers with [`FLOATS_PER_VERTEX`]
//! rather than a literal.

/// Floats in one vertex.
pub const FLOATS_PER_VERTEX: usize = 6;

/// Bytes between consecutive vertices.
pub const VERTEX_STRIDE: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();

/// Vertices emitted per visible face (two triangles, no index buffer).
pub const VERTICES_PER_FACE: usize = 6;

/// One interleaved chunk vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Atlas texture coordinates.
    pub uv: [f32; 2],
    /// Face shade multiplied by the light reaching the face, in `0.0..=1.0`.
    pub brightness: f32,
}

static_assertions::assert_eq_size!(ChunkVertex, [f32; FLOATS_PER_VERTEX]);
static_assertions::const_assert_eq!(VERTEX_STRIDE, 24);

impl ChunkVertex {
    pub fn new(position: [f32; 3], uv: [f32; 2], brightness: f32) -> Self {
        Self {
            position,
            uv,
            brightness,
        }
    }
}
