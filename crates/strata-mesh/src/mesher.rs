//! Face-culled meshing of a chunk snapshot into a flat vertex buffer.

use strata_voxel::{BlockId, BlockRegistry, Direction, MAX_LIGHT};

use crate::atlas::{MISSING_TILE, TextureAtlas};
use crate::face_direction::{TRIANGLE_CORNERS, face_corners, face_shade, face_texture};
use crate::neighborhood::{ChunkSnapshot, Neighbor};
use crate::vertex::{ChunkVertex, FLOATS_PER_VERTEX, VERTICES_PER_FACE};

/// Brightness of a face that receives no light at all, before face shading.
pub const AMBIENT_FLOOR: f32 = 0.15;

/// Geometry for one chunk: two triangles per visible face, no index buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    vertices: Vec<ChunkVertex>,
    /// Face count per [`Direction::index`].
    faces: [usize; 6],
}

impl ChunkMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the face of the voxel at world `origin` on its `dir` side.
    pub fn push_face(&mut self, dir: Direction, origin: [f32; 3], uv: [f32; 4], brightness: f32) {
        let corners = face_corners(dir, origin);
        let [min_u, min_v, max_u, max_v] = uv;
        let uvs = [[min_u, max_v], [max_u, max_v], [max_u, min_v], [min_u, min_v]];
        for corner in TRIANGLE_CORNERS {
            self.vertices.push(ChunkVertex::new(corners[corner], uvs[corner], brightness));
        }
        self.faces[dir.index()] += 1;
    }

    pub fn vertices(&self) -> &[ChunkVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().sum()
    }

    /// Faces emitted on the `dir` side of their voxels.
    pub fn faces_facing(&self, dir: Direction) -> usize {
        self.faces[dir.index()]
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn float_count(&self) -> usize {
        self.vertices.len() * FLOATS_PER_VERTEX
    }

    /// The interleaved vertex stream as raw floats.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The interleaved vertex stream as bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the buffer is whole faces of whole vertices.
    pub fn is_well_formed(&self) -> bool {
        self.vertices.len() % VERTICES_PER_FACE == 0
            && self.vertices.len() == self.face_count() * VERTICES_PER_FACE
            && self.as_floats().len() == self.float_count()
    }
}

/// Whether a face of `block` towards `neighbor` can be seen.
///
/// Faces against a missing chunk are drawn so unloaded edges never show holes.
fn face_visible(registry: &BlockRegistry, block: BlockId, neighbor: Neighbor) -> bool {
    match neighbor {
        Neighbor::Missing => true,
        Neighbor::Voxel(other, _) if other.is_air() => true,
        Neighbor::Voxel(other, _) if registry.is_opaque(other) => false,
        // Identical see-through blocks share a hidden face.
        Neighbor::Voxel(other, _) => other != block,
    }
}

/// Face shading scaled by the light level on the open side of the face.
pub fn face_brightness(dir: Direction, light: u8) -> f32 {
    let level = light.min(MAX_LIGHT) as f32 / MAX_LIGHT as f32;
    face_shade(dir) * (AMBIENT_FLOOR + (1.0 - AMBIENT_FLOOR) * level)
}

/// Builds the mesh for a snapshot.
pub fn build_mesh(snapshot: &ChunkSnapshot, registry: &BlockRegistry, atlas: &dyn TextureAtlas) -> ChunkMesh {
    let mut mesh = ChunkMesh::new();
    let data = snapshot.data();
    if data.is_empty() {
        return mesh;
    }
    let origin = snapshot.pos().world_origin(snapshot.size());

    for (index, block) in data.iter() {
        if block.is_air() {
            continue;
        }
        let (x, y, z) = data.coords_of(index);
        let (x, y, z) = (x as i32, y as i32, z as i32);
        let textures = registry.get_by_id(block).map(|b| &b.textures);
        let voxel_origin = [
            (origin.x + x) as f32,
            (origin.y + y) as f32,
            (origin.z + z) as f32,
        ];

        for dir in Direction::ALL {
            let neighbor = snapshot.neighbor(x, y, z, dir);
            if !face_visible(registry, block, neighbor) {
                continue;
            }
            let tile = textures
                .and_then(|textures| face_texture(textures, dir))
                .unwrap_or(MISSING_TILE);
            mesh.push_face(
                dir,
                voxel_origin,
                atlas.uvs(tile),
                face_brightness(dir, neighbor.light_level()),
            );
        }
    }
    mesh
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strata_voxel::{ChunkData, ChunkPos, LightChannel, LightVolume};

    use super::*;
    use crate::atlas::GridAtlas;

    fn setup() -> (BlockRegistry, GridAtlas) {
        let registry = BlockRegistry::with_defaults();
        let atlas = GridAtlas::from_registry(&registry);
        (registry, atlas)
    }

    fn snapshot(pos: ChunkPos, data: ChunkData) -> ChunkSnapshot {
        ChunkSnapshot::isolated(pos, 1, data, LightVolume::new(16))
    }

    #[test]
    fn test_empty_chunk_has_no_geometry() {
        let (registry, atlas) = setup();
        let mesh = build_mesh(&snapshot(ChunkPos::new(0, 0, 0), ChunkData::new(16)), &registry, &atlas);
        assert!(mesh.is_empty());
        assert!(mesh.is_well_formed());
    }

    #[test]
    fn test_single_block_emits_six_faces_in_world_space() {
        let (registry, atlas) = setup();
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.set(2, 3, 4, stone);
        let mesh = build_mesh(&snapshot(ChunkPos::new(1, 0, -1), data), &registry, &atlas);

        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.float_count(), 36 * FLOATS_PER_VERTEX);
        assert_eq!(mesh.as_floats().len(), mesh.float_count());
        assert!(mesh.is_well_formed());
        for vertex in mesh.vertices() {
            let [x, y, z] = vertex.position;
            assert!((18.0..=19.0).contains(&x));
            assert!((3.0..=4.0).contains(&y));
            assert!((-12.0..=-11.0).contains(&z));
        }
    }

    #[test]
    fn test_enclosed_air_pocket_meshes_only_its_walls() {
        let (registry, atlas) = setup();
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.fill(stone);
        data.set(8, 8, 8, BlockId::AIR);
        assert_eq!(data.palette_len(), 2);

        let mut solid = ChunkData::new(16);
        solid.fill(stone);
        let mut snap = snapshot(ChunkPos::new(0, 0, 0), data);
        for dir in Direction::ALL {
            snap.set_neighbor(dir, &solid, &LightVolume::new(16));
        }

        let mesh = build_mesh(&snap, &registry, &atlas);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertex_count(), 36);
        for dir in Direction::ALL {
            assert_eq!(mesh.faces_facing(dir), 1, "{}", dir.name());
        }
    }

    #[test]
    fn test_missing_neighbors_expose_chunk_edges() {
        let (registry, atlas) = setup();
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.fill(stone);
        data.set(8, 8, 8, BlockId::AIR);
        let mesh = build_mesh(&snapshot(ChunkPos::new(0, 0, 0), data), &registry, &atlas);
        assert_eq!(mesh.face_count(), 6 + 6 * 16 * 16);
        assert_eq!(mesh.vertex_count() % 6, 0);
    }

    #[test]
    fn test_same_transparent_blocks_hide_shared_face() {
        let (registry, atlas) = setup();
        let glass = registry.lookup("glass").unwrap();
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.set(4, 4, 4, glass);
        data.set(5, 4, 4, glass);
        let mesh = build_mesh(&snapshot(ChunkPos::new(0, 0, 0), data.clone()), &registry, &atlas);
        assert_eq!(mesh.face_count(), 10);

        // Stone next to glass keeps its face; glass next to stone hides its own.
        data.set(5, 4, 4, stone);
        let mesh = build_mesh(&snapshot(ChunkPos::new(0, 0, 0), data), &registry, &atlas);
        assert_eq!(mesh.face_count(), 11);
    }

    #[test]
    fn test_brightness_combines_shade_and_light() {
        assert_eq!(face_brightness(Direction::PosY, MAX_LIGHT), 1.0);
        assert!((face_brightness(Direction::NegY, 0) - 0.5 * AMBIENT_FLOOR).abs() < 1e-6);

        let (registry, atlas) = setup();
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.set(4, 4, 4, stone);
        let mut light = LightVolume::new(16);
        light.set_channel(LightChannel::Sky, 4, 5, 4, MAX_LIGHT);
        let snap = ChunkSnapshot::isolated(ChunkPos::new(0, 0, 0), 1, data, light);
        let mesh = build_mesh(&snap, &registry, &atlas);

        let top: Vec<f32> = mesh
            .vertices()
            .iter()
            .filter(|v| v.position[1] == 5.0 && v.brightness > 0.9)
            .map(|v| v.brightness)
            .collect();
        assert_eq!(top.len(), 6);
        let dark_sides = mesh.vertices().iter().filter(|v| v.brightness < 0.2).count();
        assert_eq!(dark_sides, 30);
    }

    #[test]
    fn test_face_uvs_come_from_atlas() {
        let (registry, atlas) = setup();
        let grass = registry.lookup("grass").unwrap();
        let mut data = ChunkData::new(16);
        data.set(0, 0, 0, grass);
        let mesh = build_mesh(&snapshot(ChunkPos::new(0, 0, 0), data), &registry, &atlas);

        let [min_u, min_v, max_u, max_v] = atlas.uvs("grass_top");
        let top = &mesh.vertices()[Direction::PosY.index() * 6..Direction::PosY.index() * 6 + 6];
        for vertex in top {
            assert_eq!(vertex.position[1], 1.0);
            let [u, v] = vertex.uv;
            assert!(u == min_u || u == max_u);
            assert!(v == min_v || v == max_v);
        }
    }
}
