/// Frustum - six clipping planes derived from a view-projection matrix.
///
/// Each plane is a Vec4 (A, B, C, D):
/// - (A, B, C) is the inward-pointing unit normal
/// - D is the signed offset
/// - A point P is inside if A*Px + B*Py + C*Pz + D >= 0 for all planes
///
/// Plane extraction assumes the engine's projection convention: Y flipped
/// in clip space and depth in 0..1.

use glam::{Mat4, Vec3, Vec4};

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Below this, a ray is treated as parallel to a plane
const RAY_PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_view_projection(&Mat4::IDENTITY)
    }
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Gribb & Hartmann over the rows of `vp`. With a Y-flipped projection
    /// `row3 - row1` bounds the bottom of the image and `row3 + row1` the
    /// top. With 0..1 depth the near plane is `row2` alone.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 - r1, // bottom
            r3 + r1, // top
            r2,      // near
            r3 - r2, // far
        ];

        // Degenerate matrices leave a zero normal: keep it unnormalized
        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to plane `index`, positive inside
    pub fn signed_distance(&self, index: usize, point: Vec3) -> f32 {
        let plane = self.planes[index];
        plane.truncate().dot(point) + plane.w
    }

    /// Whether `point` lies inside every plane
    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..6).all(|i| self.signed_distance(i, point) >= 0.0)
    }

    /// Conservative sphere test.
    ///
    /// A sphere is rejected only when it lies fully behind one plane,
    /// i.e. `dot(n, center) + d <= -radius`. Partially intersecting
    /// spheres are kept.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w > -radius)
    }

    /// Parametric interval `[t_enter, t_exit]` over which the ray
    /// `origin + t * dir` (t >= 0) lies inside the frustum.
    ///
    /// Returns `None` when the ray misses. A ray parallel to a plane is
    /// kept or rejected by which side of that plane its origin is on.
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
        let mut t_enter = 0.0f32;
        let mut t_exit = f32::INFINITY;

        for plane in &self.planes {
            let normal = plane.truncate();
            let denom = normal.dot(dir);
            let dist = normal.dot(origin) + plane.w;

            if denom.abs() < RAY_PARALLEL_EPSILON {
                if dist < 0.0 {
                    return None;
                }
                continue;
            }

            let t = -dist / denom;
            if denom > 0.0 {
                t_enter = t_enter.max(t);
            } else {
                t_exit = t_exit.min(t);
            }

            if t_enter > t_exit {
                return None;
            }
        }

        Some((t_enter, t_exit))
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
