/// RayEvalPass - GPU side of novel view synthesis.
///
/// Owns, per frame slot, the evaluation uniform, the array of view
/// records and the debug output buffer, bound together at
/// `sets::RAY_EVAL_DATA`. The atlas and output images are bound by the
/// application at `sets::RAY_EVAL_IMAGES`.

use bytemuck::Zeroable;
use glam::UVec2;
use crate::error::{Error, Result};
use crate::frame::FrameContext;
use crate::gpu_data::{RayEvalUniform, ViewEvalDebug, ViewEvalRecord};
use crate::graphics_device::{
    read_back, sets, upload, BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage,
    CommandList, GraphicsDevice, Pipeline,
};
use crate::engine_debug;
use super::inputs::RayEvalInputs;

/// `local_size_x` and `local_size_y` of `ray_eval.comp`
pub const RAY_EVAL_WORKGROUP_SIZE: u32 = 16;

/// Workgroups covering an image of `resolution` pixels
pub fn dispatch_size(resolution: UVec2) -> (u32, u32, u32) {
    (
        resolution.x.div_ceil(RAY_EVAL_WORKGROUP_SIZE),
        resolution.y.div_ceil(RAY_EVAL_WORKGROUP_SIZE),
        1,
    )
}

struct RayEvalFrame {
    uniform: Box<dyn Buffer>,
    records: Box<dyn Buffer>,
    debug: Box<dyn Buffer>,
    group: Box<dyn BindingGroup>,
}

pub struct RayEvalPass {
    frames: Vec<RayEvalFrame>,
    max_views: usize,
    /// Novel resolution of the last upload, per frame slot
    resolutions: Vec<UVec2>,
}

impl RayEvalPass {
    pub fn new(
        device: &dyn GraphicsDevice,
        pipeline: &dyn Pipeline,
        max_views: usize,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let record_bytes = (std::mem::size_of::<ViewEvalRecord>() * max_views) as u64;
        let debug_bytes = (std::mem::size_of::<ViewEvalDebug>() * max_views) as u64;

        let mut frames = Vec::with_capacity(frames_in_flight);
        for f in 0..frames_in_flight {
            let uniform = device.create_buffer(BufferDesc::new(
                format!("ray_eval_frame{}_uniform", f),
                std::mem::size_of::<RayEvalUniform>() as u64,
                BufferUsage::Uniform,
            ))?;
            let records = device.create_buffer(BufferDesc::new(
                format!("ray_eval_frame{}_views", f),
                record_bytes,
                BufferUsage::Storage,
            ))?;
            let debug = device.create_buffer(BufferDesc::new(
                format!("ray_eval_frame{}_debug", f),
                debug_bytes,
                BufferUsage::Storage,
            ))?;
            let group = device.create_binding_group(
                pipeline,
                sets::RAY_EVAL_DATA,
                &[
                    BindingResource::UniformBuffer(uniform.as_ref()),
                    BindingResource::StorageBuffer(records.as_ref()),
                    BindingResource::StorageBuffer(debug.as_ref()),
                ],
            )?;
            frames.push(RayEvalFrame { uniform, records, debug, group });
        }

        engine_debug!(
            "mview::RayEvalPass",
            "Created ray-eval resources for {} views x {} frames",
            max_views,
            frames_in_flight
        );

        Ok(Self { frames, max_views, resolutions: vec![UVec2::ZERO; frames_in_flight] })
    }

    fn frame(&self, index: usize) -> Result<&RayEvalFrame> {
        self.frames.get(index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "frame slot {} out of range (frames in flight: {})",
                index,
                self.frames.len()
            ))
        })
    }

    /// Upload this frame's inputs. With a test pixel set, the debug
    /// records are cleared so stale results are never read back.
    pub fn update(&mut self, frame: &FrameContext, inputs: &RayEvalInputs) -> Result<()> {
        if inputs.records.len() > self.max_views {
            return Err(Error::InvalidResource(format!(
                "{} view records exceed ray-eval capacity {}",
                inputs.records.len(),
                self.max_views
            )));
        }

        let slot = self.frame(frame.index)?;
        upload(slot.uniform.as_ref(), 0, std::slice::from_ref(&inputs.uniform))?;
        upload(slot.records.as_ref(), 0, &inputs.records)?;
        if inputs.test_pixel().is_some() {
            let cleared = vec![ViewEvalDebug::zeroed(); self.max_views];
            upload(slot.debug.as_ref(), 0, &cleared)?;
        }

        self.resolutions[frame.index] = inputs.resolution();
        Ok(())
    }

    /// Record the evaluation dispatch for this frame slot
    pub fn record(
        &self,
        cmd: &mut dyn CommandList,
        pipeline: &dyn Pipeline,
        images: &dyn BindingGroup,
        frame: &FrameContext,
    ) -> Result<()> {
        let slot = self.frame(frame.index)?;
        let (x, y, z) = dispatch_size(self.resolutions[frame.index]);
        if x == 0 || y == 0 {
            return Ok(());
        }

        cmd.bind_pipeline(pipeline)?;
        cmd.bind_binding_group(pipeline, sets::RAY_EVAL_DATA, slot.group.as_ref())?;
        cmd.bind_binding_group(pipeline, sets::RAY_EVAL_IMAGES, images)?;
        cmd.dispatch(x, y, z)
    }

    /// Debug records written by the last completed dispatch of a slot
    pub fn read_debug(&self, frame_index: usize, view_count: usize) -> Result<Vec<ViewEvalDebug>> {
        let slot = self.frame(frame_index)?;
        read_back(slot.debug.as_ref(), 0, view_count.min(self.max_views))
    }

    pub fn max_views(&self) -> usize {
        self.max_views
    }

    pub fn uniform_buffer(&self, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.frame(frame_index)?.uniform.as_ref())
    }

    pub fn records_buffer(&self, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.frame(frame_index)?.records.as_ref())
    }

    /// Release every slot. The caller waits for the device first.
    pub fn destroy(self, device: &dyn GraphicsDevice) -> Result<()> {
        for frame in self.frames {
            device.destroy_binding_group(frame.group)?;
            device.destroy_buffer(frame.uniform)?;
            device.destroy_buffer(frame.records)?;
            device.destroy_buffer(frame.debug)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
