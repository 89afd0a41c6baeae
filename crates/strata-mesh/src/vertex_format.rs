//! Canonical `wgpu::VertexBufferLayout` for chunk meshes.
//!
//! Chunk pipelines reference [`CHUNK_VERTEX_LAYOUT`] so the shader inputs
//! cannot drift from [`ChunkVertex`].
//!
//! ## Attribute Packing
//!
//! | Location | Offset | Format    | Field      |
//! |----------|--------|-----------|------------|
//! | 0        | 0      | Float32x3 | position   |
//! | 1        | 12     | Float32x2 | uv         |
//! | 2        | 20     | Float32   | brightness |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::vertex::{ChunkVertex, VERTEX_STRIDE};

/// Vertex attributes for the chunk mesh format.
pub const CHUNK_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 20,
        shader_location: 2,
    },
];

/// The vertex buffer layout for chunk render pipelines.
pub const CHUNK_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<ChunkVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &CHUNK_VERTEX_ATTRIBUTES,
};

/// Owned copy of [`CHUNK_VERTEX_LAYOUT`].
pub fn chunk_vertex_buffer_layout() -> VertexBufferLayout<'static> {
    CHUNK_VERTEX_LAYOUT
}

// ---------------------------------------------------------------------------
// Compile-time validation
// ---------------------------------------------------------------------------

const _: () = assert!(
    mem::size_of::<ChunkVertex>() == VERTEX_STRIDE,
    "ChunkVertex size changed; update CHUNK_VERTEX_LAYOUT"
);

const _: () = assert!(CHUNK_VERTEX_ATTRIBUTES[0].offset == mem::offset_of!(ChunkVertex, position) as u64);
const _: () = assert!(CHUNK_VERTEX_ATTRIBUTES[1].offset == mem::offset_of!(ChunkVertex, uv) as u64);
const _: () = assert!(CHUNK_VERTEX_ATTRIBUTES[2].offset == mem::offset_of!(ChunkVertex, brightness) as u64);

const _: () = assert!(
    CHUNK_VERTEX_ATTRIBUTES[2].offset + 4 == VERTEX_STRIDE as u64,
    "Last attribute must end at the vertex stride"
);
