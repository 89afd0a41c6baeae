//! Per-direction face geometry: corner layout, winding, and baked shading.

use strata_voxel::{BlockTextures, Direction};

/// Corner offsets of the unit face on each side of a voxel.
///
/// Corners run counter-clockwise when viewed from outside the voxel, so
/// `(c1 - c0) × (c2 - c0)` points along the face normal. `c0 → c1` runs
/// along the texture's u axis and `c0 → c3` along its v axis (up for side
/// faces).
const CORNERS: [[[f32; 3]; 4]; 6] = [
    // +X
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
    // -X
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    // +Y
    [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    // -Y
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
    // +Z
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    // -Z
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
];

/// Corner order of the two triangles making up a face.
pub const TRIANGLE_CORNERS: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// The four corners of the face of voxel `origin` on its `dir` side.
pub fn face_corners(dir: Direction, origin: [f32; 3]) -> [[f32; 3]; 4] {
    CORNERS[dir.index()].map(|[x, y, z]| [origin[0] + x, origin[1] + y, origin[2] + z])
}

/// Brightness multiplier baked into every vertex of a face.
///
/// Stands in for normal-based shading: tops are brightest, bottoms darkest,
/// and the two horizontal axes differ so edges stay readable.
pub fn face_shade(dir: Direction) -> f32 {
    match dir {
        Direction::PosY => 1.0,
        Direction::NegY => 0.5,
        Direction::PosZ | Direction::NegZ => 0.8,
        Direction::PosX | Direction::NegX => 0.6,
    }
}

/// Atlas tile a block shows on its `dir` side.
pub fn face_texture(textures: &BlockTextures, dir: Direction) -> Option<&str> {
    match dir {
        Direction::PosY => textures.top(),
        Direction::NegY => textures.bottom(),
        _ => textures.side(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn test_winding_matches_normal() {
        for dir in Direction::ALL {
            let c = face_corners(dir, [0.0, 0.0, 0.0]);
            let normal = cross(sub(c[1], c[0]), sub(c[2], c[0]));
            let (dx, dy, dz) = dir.offset();
            assert_eq!(normal, [dx as f32, dy as f32, dz as f32], "{}", dir.name());
        }
    }

    #[test]
    fn test_corners_lie_on_face_plane() {
        for dir in Direction::ALL {
            let (dx, dy, dz) = dir.offset();
            let axis = [dx, dy, dz].iter().position(|d| *d != 0).unwrap();
            let plane = if dx + dy + dz > 0 { 4.0 } else { 3.0 };
            for corner in face_corners(dir, [3.0, 3.0, 3.0]) {
                assert_eq!(corner[axis], plane);
            }
        }
    }

    #[test]
    fn test_side_faces_have_vertical_v_axis() {
        for dir in Direction::LATERAL {
            let c = face_corners(dir, [0.0, 0.0, 0.0]);
            assert_eq!(sub(c[3], c[0]), [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_shading_order() {
        assert!(face_shade(Direction::PosY) > face_shade(Direction::PosZ));
        assert!(face_shade(Direction::PosZ) > face_shade(Direction::PosX));
        assert!(face_shade(Direction::PosX) > face_shade(Direction::NegY));
    }

    #[test]
    fn test_face_texture_selects_tile() {
        let textures = BlockTextures::TopSideBottom {
            top: "grass_top".into(),
            side: "grass_side".into(),
            bottom: "dirt".into(),
        };
        assert_eq!(face_texture(&textures, Direction::PosY), Some("grass_top"));
        assert_eq!(face_texture(&textures, Direction::NegZ), Some("grass_side"));
        assert_eq!(face_texture(&textures, Direction::NegY), Some("dirt"));
        assert_eq!(face_texture(&BlockTextures::None, Direction::PosX), None);
    }
}
