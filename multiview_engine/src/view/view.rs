/// View - one viewport of the grid: a camera, a pixel rectangle inside
/// the shared atlas, per-frame GPU uniforms, and two per-view toggles.
///
/// The view exclusively owns its per-frame buffers and binding groups.
/// Releasing them is explicit and staged per frame slot, because a slot
/// may still be read by a command stream in flight.

use glam::{UVec2, Vec2};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::frame::{FrameContext, FrameMask, FrameSlot};
use crate::gpu_data::{mat4_cols, planes_array, ViewCullData, ViewFragmentData, ViewVertexData};
use crate::graphics_device::{
    sets, BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage, GraphicsDevice,
    Rect2D, StagePipelines, Viewport,
};

/// Stable identity of a view, recycled after the view is fully removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl ViewId {
    /// Index into per-view arenas
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Removal state of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewLifecycle {
    Active,
    /// Some frame slots released, the rest may still be in flight
    PendingRemoval(FrameMask),
    /// Every frame slot released
    Removed,
}

/// GPU resources of one frame slot
struct ViewFrameResources {
    vertex_uniform: Box<dyn Buffer>,
    fragment_uniform: Box<dyn Buffer>,
    cull_uniform: Box<dyn Buffer>,
    render_group: Box<dyn BindingGroup>,
    cull_group: Box<dyn BindingGroup>,
}

impl ViewFrameResources {
    fn create(
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        id: ViewId,
        frame: usize,
    ) -> Result<Self> {
        let name = |kind: &str| format!("view{}_frame{}_{}", id.0, frame, kind);

        let vertex_uniform = device.create_buffer(BufferDesc::new(
            name("vertex"),
            std::mem::size_of::<ViewVertexData>() as u64,
            BufferUsage::Uniform,
        ))?;
        let fragment_uniform = device.create_buffer(BufferDesc::new(
            name("fragment"),
            std::mem::size_of::<ViewFragmentData>() as u64,
            BufferUsage::Uniform,
        ))?;
        let cull_uniform = device.create_buffer(BufferDesc::new(
            name("cull"),
            std::mem::size_of::<ViewCullData>() as u64,
            BufferUsage::Uniform,
        ))?;

        let render_group = device.create_binding_group(
            pipelines.render,
            sets::RENDER_VIEW,
            &[
                BindingResource::UniformBuffer(vertex_uniform.as_ref()),
                BindingResource::UniformBuffer(fragment_uniform.as_ref()),
            ],
        )?;
        let cull_group = device.create_binding_group(
            pipelines.cull,
            sets::CULL_VIEW,
            &[BindingResource::UniformBuffer(cull_uniform.as_ref())],
        )?;

        Ok(Self { vertex_uniform, fragment_uniform, cull_uniform, render_group, cull_group })
    }

    fn destroy(self, device: &dyn GraphicsDevice) -> Result<()> {
        device.destroy_binding_group(self.render_group)?;
        device.destroy_binding_group(self.cull_group)?;
        device.destroy_buffer(self.vertex_uniform)?;
        device.destroy_buffer(self.fragment_uniform)?;
        device.destroy_buffer(self.cull_uniform)
    }
}

pub struct View {
    id: ViewId,
    camera: Camera,
    viewport_origin: UVec2,
    resolution: UVec2,
    frustum_cull: bool,
    depth_only: bool,
    frames: Vec<Option<ViewFrameResources>>,
    lifecycle: ViewLifecycle,
}

impl View {
    /// Create a view and its resources for every frame slot
    pub fn new(
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        id: ViewId,
        mut camera: Camera,
        viewport_origin: UVec2,
        resolution: UVec2,
        frames_in_flight: usize,
    ) -> Result<Self> {
        camera.set_resolution(resolution.as_vec2());

        let frames = (0..frames_in_flight)
            .map(|frame| ViewFrameResources::create(device, pipelines, id, frame).map(Some))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            camera,
            viewport_origin,
            resolution,
            frustum_cull: true,
            depth_only: false,
            frames,
            lifecycle: ViewLifecycle::Active,
        })
    }

    /// Write view/projection and the depth-only flag for this frame slot
    pub fn update_descriptor_data(&self, frame: &FrameContext) -> Result<()> {
        let resources = self.frame_resources(frame.index)?;

        let vertex = ViewVertexData {
            view: mat4_cols(self.camera.view_matrix()),
            proj: mat4_cols(self.camera.projection_matrix()),
        };
        resources.vertex_uniform.update(0, bytemuck::bytes_of(&vertex))?;

        let fragment = ViewFragmentData { depth_only: self.depth_only as u32, _pad: [0; 3] };
        resources.fragment_uniform.update(0, bytemuck::bytes_of(&fragment))
    }

    /// Write the culling input for this frame slot
    pub fn update_compute_descriptor_data(&self, frame: &FrameContext, total_mesh_count: u32) -> Result<()> {
        let resources = self.frame_resources(frame.index)?;
        let data = self.cull_data(total_mesh_count);
        resources.cull_uniform.update(0, bytemuck::bytes_of(&data))
    }

    /// Culling input as written by `update_compute_descriptor_data`
    pub fn cull_data(&self, total_mesh_count: u32) -> ViewCullData {
        ViewCullData {
            frustum_planes: planes_array(self.camera.frustum_planes()),
            total_meshes: total_mesh_count,
            frustum_cull: self.frustum_cull as u32,
            _pad: [0; 2],
        }
    }

    /// Release the GPU resources of one frame slot or of all of them.
    ///
    /// The caller guarantees the GPU no longer reads the released slots.
    /// Any release moves the view towards `Removed`.
    pub fn destroy_resources(&mut self, device: &dyn GraphicsDevice, slot: FrameSlot) -> Result<()> {
        let frames = self.frames.len();
        let range = match slot {
            FrameSlot::Index(index) if index < frames => index..index + 1,
            FrameSlot::Index(index) => {
                return Err(Error::InvalidResource(format!(
                    "view {} has no frame slot {}",
                    self.id.0, index
                )))
            }
            FrameSlot::All => 0..frames,
        };

        let mut released = match self.lifecycle {
            ViewLifecycle::Active => FrameMask::EMPTY,
            ViewLifecycle::PendingRemoval(mask) => mask,
            ViewLifecycle::Removed => FrameMask::all(frames),
        };

        for index in range {
            if let Some(resources) = self.frames[index].take() {
                resources.destroy(device)?;
            }
            released = released.with(index);
        }

        self.lifecycle = if released.is_complete(frames) {
            ViewLifecycle::Removed
        } else {
            ViewLifecycle::PendingRemoval(released)
        };
        Ok(())
    }

    fn frame_resources(&self, index: usize) -> Result<&ViewFrameResources> {
        self.frames
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                Error::InvalidResource(format!("view {} frame slot {} is released", self.id.0, index))
            })
    }

    // ===== GETTERS =====

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn viewport_origin(&self) -> UVec2 {
        self.viewport_origin
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn frustum_cull(&self) -> bool {
        self.frustum_cull
    }

    pub fn depth_only(&self) -> bool {
        self.depth_only
    }

    pub fn lifecycle(&self) -> ViewLifecycle {
        self.lifecycle
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Draw region of this view inside the atlas
    pub fn viewport(&self) -> Viewport {
        Viewport {
            x: self.viewport_origin.x as f32,
            y: self.viewport_origin.y as f32,
            width: self.resolution.x as f32,
            height: self.resolution.y as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn scissor(&self) -> Rect2D {
        Rect2D {
            x: self.viewport_origin.x as i32,
            y: self.viewport_origin.y as i32,
            width: self.resolution.x,
            height: self.resolution.y,
        }
    }

    pub fn render_binding_group(&self, frame: &FrameContext) -> Result<&dyn BindingGroup> {
        Ok(self.frame_resources(frame.index)?.render_group.as_ref())
    }

    pub fn cull_binding_group(&self, frame: &FrameContext) -> Result<&dyn BindingGroup> {
        Ok(self.frame_resources(frame.index)?.cull_group.as_ref())
    }

    pub fn vertex_uniform(&self, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.frame_resources(frame_index)?.vertex_uniform.as_ref())
    }

    pub fn fragment_uniform(&self, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.frame_resources(frame_index)?.fragment_uniform.as_ref())
    }

    pub fn cull_uniform(&self, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.frame_resources(frame_index)?.cull_uniform.as_ref())
    }

    // ===== SETTERS =====

    /// Move or resize the draw region.
    ///
    /// Takes effect on the next descriptor update and the next recorded
    /// draw, never on command streams already in flight.
    pub fn set_viewport_rect(&mut self, origin: UVec2, resolution: UVec2) {
        self.viewport_origin = origin;
        self.resolution = resolution;
        self.camera.set_resolution(Vec2::new(resolution.x as f32, resolution.y as f32));
    }

    pub fn set_frustum_cull(&mut self, enabled: bool) {
        self.frustum_cull = enabled;
    }

    pub fn set_depth_only(&mut self, enabled: bool) {
        self.depth_only = enabled;
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
