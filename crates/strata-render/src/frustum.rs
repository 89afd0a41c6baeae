//! View-frustum culling against planes extracted from the view-projection
//! matrix, and the [`ViewVolume`] interface the chunk renderer culls with.

use glam::{Mat4, Vec3, Vec4};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// An axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Radius of the sphere through the box corners.
    pub fn bounding_radius(&self) -> f32 {
        self.extents().length()
    }

    /// Squared distance from `point` to the nearest point of the box.
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        point.clamp(self.min, self.max).distance_squared(point)
    }
}

/// A view frustum defined by six inward-pointing planes.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far. Each `Vec4(a, b, c, d)` has a
    /// unit inward normal `(a, b, c)`.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts frustum planes from a combined view-projection matrix using
    /// the Griggs-Hartmann method, for a reverse-Z projection with depth in
    /// `0..1` (near at 1, far at 0).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // z <= w is the near plane and z >= 0 the far plane.
        planes[NEAR] = rows[3] - rows[2];
        planes[FAR] = rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Whether an AABB is at least partially inside the frustum.
    ///
    /// Uses the positive-vertex test: conservative near frustum corners,
    /// never rejects a visible box.
    pub fn is_aabb_visible(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w >= 0.0
        })
    }

    /// Whether a sphere is at least partially inside the frustum.
    pub fn is_sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }
}

/// Visibility queries the chunk renderer needs from a camera.
pub trait ViewVolume {
    /// World-space eye position.
    fn position(&self) -> Vec3;

    fn is_sphere_visible(&self, center: Vec3, radius: f32) -> bool;

    fn is_aabb_visible(&self, aabb: &Aabb) -> bool;

    /// Sphere test that also rejects spheres entirely beyond `max_distance`.
    fn is_sphere_visible_within(&self, center: Vec3, radius: f32, max_distance: f32) -> bool {
        let reach = max_distance + radius;
        self.position().distance_squared(center) <= reach * reach && self.is_sphere_visible(center, radius)
    }

    /// AABB test that also rejects boxes entirely beyond `max_distance`.
    fn is_aabb_visible_within(&self, aabb: &Aabb, max_distance: f32) -> bool {
        aabb.distance_squared(self.position()) <= max_distance * max_distance && self.is_aabb_visible(aabb)
    }
}

/// A camera pose frozen for one frame.
#[derive(Clone, Debug)]
pub struct CameraView {
    position: Vec3,
    frustum: Frustum,
}

impl CameraView {
    pub fn new(position: Vec3, frustum: Frustum) -> Self {
        Self { position, frustum }
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

impl ViewVolume for CameraView {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.frustum.is_sphere_visible(center, radius)
    }

    fn is_aabb_visible(&self, aabb: &Aabb) -> bool {
        self.frustum.is_aabb_visible(aabb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_camera_vp() -> Mat4 {
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 1000.0, 0.1);
        proj * view
    }

    fn frustum() -> Frustum {
        Frustum::from_view_projection(&default_camera_vp())
    }

    #[test]
    fn test_object_in_front_visible() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -5.0), Vec3::new(1.0, 1.0, -3.0));
        assert!(frustum().is_aabb_visible(&aabb));
        assert!(frustum().is_sphere_visible(Vec3::new(0.0, 0.0, -4.0), 1.0));
    }

    #[test]
    fn test_all_six_planes_reject() {
        let frustum = frustum();
        let cases = [
            ("behind", Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 10.0))),
            ("left", Aabb::new(Vec3::new(-1000.0, 0.0, -5.0), Vec3::new(-999.0, 1.0, -4.0))),
            ("right", Aabb::new(Vec3::new(999.0, 0.0, -5.0), Vec3::new(1000.0, 1.0, -4.0))),
            ("above", Aabb::new(Vec3::new(0.0, 999.0, -5.0), Vec3::new(1.0, 1000.0, -4.0))),
            ("below", Aabb::new(Vec3::new(0.0, -1000.0, -5.0), Vec3::new(1.0, -999.0, -4.0))),
            ("beyond far", Aabb::new(Vec3::new(0.0, 0.0, -2000.0), Vec3::new(1.0, 1.0, -1500.0))),
            ("before near", Aabb::new(Vec3::new(-0.01, -0.01, -0.05), Vec3::new(0.01, 0.01, -0.02))),
        ];
        for (name, aabb) in cases {
            assert!(!frustum.is_aabb_visible(&aabb), "{name}");
        }
    }

    #[test]
    fn test_sphere_straddling_plane_is_visible() {
        let frustum = frustum();
        // Centre behind the camera, but the sphere reaches into the view.
        assert!(frustum.is_sphere_visible(Vec3::new(0.0, 0.0, 2.0), 5.0));
        assert!(!frustum.is_sphere_visible(Vec3::new(0.0, 0.0, 20.0), 5.0));
        assert!(!frustum.is_sphere_visible(Vec3::new(0.0, 0.0, -1200.0), 50.0));
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in &frustum().planes {
            assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_distance_qualified_queries() {
        let view = CameraView::new(Vec3::ZERO, frustum());
        let center = Vec3::new(0.0, 0.0, -100.0);
        assert!(view.is_sphere_visible_within(center, 8.0, 200.0));
        assert!(!view.is_sphere_visible_within(center, 8.0, 50.0));
        assert!(view.is_sphere_visible_within(center, 8.0, 92.0));

        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -101.0), Vec3::new(1.0, 1.0, -99.0));
        assert!(view.is_aabb_visible_within(&aabb, 100.0));
        assert!(!view.is_aabb_visible_within(&aabb, 98.0));
    }

    #[test]
    fn test_aabb_helpers() {
        let aabb = Aabb::new(Vec3::new(-2.0, -3.0, -4.0), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.extents(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(aabb.distance_squared(Vec3::ZERO), 0.0);
        assert_eq!(aabb.distance_squared(Vec3::new(5.0, 0.0, 0.0)), 9.0);
    }
}
