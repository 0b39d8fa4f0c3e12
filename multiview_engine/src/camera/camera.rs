/// Camera - projection and view matrices plus the derived frustum.
///
/// Parameters (eye, logical view direction, lens) are plain setters.
/// Matrices are rebuilt only by `reconstruct_matrices`, once per frame,
/// so the frustum is always a snapshot of the last reconstruction.

use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::config::DEFAULT_VIEW_DIR;
use super::frustum::Frustum;

/// Below this, the view direction and up vector are treated as parallel
const PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct Camera {
    resolution: Vec2,
    eye: Vec3,
    up: Vec3,
    /// Direction in grid-local space
    view_dir: Vec3,
    /// `view_dir` after the last grid transform
    world_view_dir: Vec3,
    near: f32,
    far: f32,
    fov_degrees: f32,

    view: Mat4,
    inv_view: Mat4,
    proj: Mat4,
    inv_proj: Mat4,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::new(800.0, 600.0), Vec3::new(2.0, 10.0, 2.0), DEFAULT_VIEW_DIR, Vec3::Y, 45.0, 0.1, 100.0)
    }
}

impl Camera {
    /// Create a camera and build its matrices with no grid transform
    pub fn new(
        resolution: Vec2,
        eye: Vec3,
        view_dir: Vec3,
        up: Vec3,
        fov_degrees: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Self {
            resolution,
            eye,
            up,
            view_dir,
            world_view_dir: view_dir,
            near,
            far,
            fov_degrees,
            view: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            inv_proj: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.reconstruct_matrices(&Mat4::IDENTITY);
        camera
    }

    /// Rebuild view, projection, their inverses and the frustum.
    ///
    /// `grid_transform` rotates the logical view direction into world
    /// space. The eye is taken as already expressed in world space.
    pub fn reconstruct_matrices(&mut self, grid_transform: &Mat4) {
        debug_assert!(self.resolution.y != 0.0, "camera resolution.y must be non-zero");

        let world_dir = grid_transform.transform_vector3(self.view_dir);
        self.world_view_dir = if world_dir.length_squared() > 0.0 {
            world_dir.normalize()
        } else {
            world_dir
        };

        self.view = Mat4::look_at_rh(self.eye, self.eye + self.world_view_dir, self.stable_up());
        self.inv_view = self.view.inverse();

        let mut proj = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.resolution.x / self.resolution.y,
            self.near,
            self.far,
        );
        // Vulkan clip space has Y pointing down
        proj.y_axis.y *= -1.0;
        self.proj = proj;
        self.inv_proj = proj.inverse();

        self.frustum = Frustum::from_view_projection(&(self.proj * self.view));
    }

    /// Up vector that is not parallel to the current world direction
    fn stable_up(&self) -> Vec3 {
        if self.world_view_dir.cross(self.up).length_squared() > PARALLEL_EPSILON {
            return self.up;
        }
        if self.world_view_dir.cross(Vec3::Z).length_squared() > PARALLEL_EPSILON {
            Vec3::Z
        } else {
            Vec3::X
        }
    }

    // ===== GETTERS =====

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Logical (grid-local) view direction
    pub fn view_dir(&self) -> Vec3 {
        self.view_dir
    }

    /// World-space view direction of the last reconstruction
    pub fn world_view_dir(&self) -> Vec3 {
        self.world_view_dir
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    pub fn inverse_view_matrix(&self) -> &Mat4 {
        &self.inv_view
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.proj
    }

    pub fn inverse_projection_matrix(&self) -> &Mat4 {
        &self.inv_proj
    }

    /// Combined view-projection matrix (projection * view)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.proj * self.view
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Left, right, bottom, top, near, far
    pub fn frustum_planes(&self) -> &[Vec4; 6] {
        &self.frustum.planes
    }

    // ===== SETTERS =====

    pub fn set_resolution(&mut self, resolution: Vec2) {
        self.resolution = resolution;
    }

    pub fn set_eye(&mut self, eye: Vec3) {
        self.eye = eye;
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.up = up;
    }

    pub fn set_view_dir(&mut self, view_dir: Vec3) {
        self.view_dir = view_dir;
    }

    pub fn set_fov_degrees(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
    }

    pub fn set_near_far(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
