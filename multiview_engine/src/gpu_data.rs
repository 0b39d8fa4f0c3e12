/// GPU-visible data layouts shared with the shaders in `shaders/`
///
/// Every struct is `#[repr(C)]` and built only from 4-byte scalars and
/// arrays of them, so `bytemuck::Pod` holds without hidden padding and
/// the byte layout matches std140/std430 as declared in GLSL.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Matches `VkDrawIndexedIndirectCommand`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    /// Visibility signal: 1 drawn, 0 culled
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// Stable draw index, used by shaders to fetch per-mesh data
    pub first_instance: u32,
}

impl DrawIndexedIndirectCommand {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// World-space bounding sphere: xyz center, w radius
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoundingSphere {
    pub center_radius: [f32; 4],
}

impl BoundingSphere {
    pub fn new(center: glam::Vec3, radius: f32) -> Self {
        Self { center_radius: [center.x, center.y, center.z, radius] }
    }

    pub fn center(&self) -> glam::Vec3 {
        glam::Vec3::new(self.center_radius[0], self.center_radius[1], self.center_radius[2])
    }

    pub fn radius(&self) -> f32 {
        self.center_radius[3]
    }
}

/// Per-view vertex stage uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewVertexData {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

/// Per-view fragment stage uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ViewFragmentData {
    pub depth_only: u32,
    pub _pad: [u32; 3],
}

/// Per-view culling input
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewCullData {
    /// Left, right, bottom, top, near, far
    pub frustum_planes: [[f32; 4]; 6],
    pub total_meshes: u32,
    pub frustum_cull: u32,
    pub _pad: [u32; 2],
}

/// Per-mesh flat material: diffuse color and (opacity, color tex id, bump tex id, unused)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshGpuData {
    pub diffuse_color: [f32; 4],
    pub params: [f32; 4],
}

bitflags::bitflags! {
    /// Bits of `RayEvalUniform::sampling_flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SamplingFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH_DISTANCE = 1 << 1;
        const DEPTH_ANGLE = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Bits of `RayEvalUniform::eval_flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EvalFlags: u32 {
        const AUTO_SAMPLE_COUNT = 1 << 0;
        const THRESHOLD_DEPTH = 1 << 1;
    }
}

/// Ray evaluation pass uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RayEvalUniform {
    pub inv_view: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    /// Novel image resolution
    pub resolution: [f32; 2],
    /// Source atlas resolution
    pub atlas_resolution: [f32; 2],
    pub view_count: i32,
    pub sampling_flags: u32,
    /// Non-zero when the debug pixel path is active
    pub test_pixel: u32,
    pub num_ray_samples: i32,
    pub tested_pixel: [f32; 2],
    pub max_sample_distance: f32,
    pub eval_flags: u32,
    pub views_used: i32,
    pub _pad: [u32; 3],
}

/// One source view as seen by the ray evaluation pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewEvalRecord {
    pub frustum_planes: [[f32; 4]; 6],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    /// xy viewport size, zw viewport origin in the atlas
    pub res_offset: [f32; 4],
    pub near_far: [f32; 2],
    pub _pad: [f32; 2],
    /// World-space view direction, w unused
    pub view_dir: [f32; 4],
}

/// Debug output of the inspected pixel, one record per source view
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewEvalDebug {
    pub frustum_planes: [[f32; 4]; 6],
    pub num_intersections: i32,
    pub num_found_intervals: i32,
    pub view_res: [f32; 2],
    /// xyz reconstructed world point, w 1 when a surface was found
    pub point_in_world: [f32; 4],
}

pub(crate) fn mat4_cols(m: &Mat4) -> [[f32; 4]; 4] {
    m.to_cols_array_2d()
}

pub(crate) fn planes_array(planes: &[Vec4; 6]) -> [[f32; 4]; 6] {
    planes.map(|p| p.to_array())
}

#[cfg(test)]
#[path = "gpu_data_tests.rs"]
mod tests;
