/// FrameOrchestrator - drives one frame through both command streams.
///
/// Per frame slot it owns a compute and a graphics command list, the
/// fence that tells the CPU the slot is idle, and the semaphore that
/// orders compute before graphics. A frame goes through:
///
/// 1. `begin_frame` waits on the slot's fence, then resets it
/// 2. `prepare_views` and `prepare_ray_eval` write this slot's uniforms
/// 3. `record_compute` records culling then ray evaluation
/// 4. `record_graphics` rasterizes every view into the atlas, then composites
/// 5. `submit` sends compute, then graphics waiting on compute
/// 6. `end_frame` moves to the next slot
///
/// Ray evaluation samples the atlas as it was before this frame's
/// rasterization, i.e. the previous frame's grid images.

use std::time::Duration;
use glam::UVec2;
use crate::camera::Camera;
use crate::config::RayEvalConfig;
use crate::culling::GpuCuller;
use crate::error::{Error, Result};
use crate::gpu_data::DrawIndexedIndirectCommand;
use crate::graphics_device::{
    sets, BindingGroup, ClearValue, CommandList, Fence, GraphicsDevice, IndexType, Pipeline,
    PipelineStage, QueueKind, RenderTarget, Semaphore, StagePipelines, SubmitInfo,
};
use crate::grid::ViewGrid;
use crate::ray_eval::{RayEvalInputs, RayEvalPass, BACKGROUND};
use crate::scene::Scene;
use crate::{engine_error, engine_trace};
use super::context::FrameContext;
use super::modes::RenderModes;

const SOURCE: &str = "mview::FrameOrchestrator";

/// Presentation work recorded after the grid is rasterized: blitting the
/// atlas or the novel image to the screen, UI overlays, readbacks.
pub trait CompositePass {
    fn record(&self, cmd: &mut dyn CommandList, modes: &RenderModes, frame: &FrameContext) -> Result<()>;
}

/// What the ray-eval dispatch needs besides its own data
#[derive(Clone, Copy)]
pub struct RayEvalDispatch<'a> {
    pub pass: &'a RayEvalPass,
    pub pipeline: &'a dyn Pipeline,
    /// Atlas input and novel output images, bound at `sets::RAY_EVAL_IMAGES`
    pub images: &'a dyn BindingGroup,
}

/// Render target and bindings of the grid rasterization
#[derive(Clone, Copy)]
pub struct GridRaster<'a> {
    pub target: &'a dyn RenderTarget,
    pub pipeline: &'a dyn Pipeline,
    /// Texture bindings, bound at `sets::RENDER_MATERIALS` when present
    pub materials: Option<&'a dyn BindingGroup>,
}

fn slot_out_of_range(index: usize) -> Error {
    Error::InvalidResource(format!("frame slot {} out of range", index))
}

struct FrameSync {
    compute: Box<dyn CommandList>,
    graphics: Box<dyn CommandList>,
    fence: Box<dyn Fence>,
    compute_done: Box<dyn Semaphore>,
}

pub struct FrameOrchestrator {
    slots: Vec<FrameSync>,
    culler: GpuCuller,
    fence_timeout: Option<Duration>,
    index: usize,
    number: u64,
}

impl FrameOrchestrator {
    pub fn new(device: &dyn GraphicsDevice, frames_in_flight: usize, fence_timeout: Option<Duration>) -> Result<Self> {
        if frames_in_flight == 0 {
            return Err(Error::InitializationFailed("at least one frame in flight is required".to_string()));
        }

        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            slots.push(FrameSync {
                compute: device.create_command_list(QueueKind::Compute)?,
                graphics: device.create_command_list(QueueKind::Graphics)?,
                // Signaled, so the first wait on each slot returns at once
                fence: device.create_fence(true)?,
                compute_done: device.create_semaphore()?,
            });
        }

        Ok(Self { slots, culler: GpuCuller::new(), fence_timeout, index: 0, number: 0 })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Context of the frame that the next `begin_frame` opens
    pub fn current_frame(&self) -> FrameContext {
        FrameContext::new(self.index, self.number, self.slots.len())
    }

    fn slot(&self, index: usize) -> Result<&FrameSync> {
        self.slots.get(index).ok_or_else(|| slot_out_of_range(index))
    }

    /// Wait until the current slot's previous submission completed
    pub fn begin_frame(&mut self) -> Result<FrameContext> {
        let frame = self.current_frame();
        let slot = self.slot(frame.index)?;
        if let Err(err) = slot.fence.wait(self.fence_timeout) {
            engine_error!(SOURCE, "Fence wait of frame slot {} failed: {}", frame.index, err);
            return Err(err);
        }
        slot.fence.reset()?;
        engine_trace!(SOURCE, "Frame {} began on slot {}", frame.number, frame.index);
        Ok(frame)
    }

    /// Bring the grid, its views and the scene's command copies up to date
    /// for this slot. Runs after `begin_frame`, so the slot is idle.
    pub fn prepare_views(
        &self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        grid: &mut ViewGrid,
        scene: &mut Scene,
        modes: &RenderModes,
        frame: &FrameContext,
    ) -> Result<()> {
        grid.reclaim_retired(device, frame)?;
        scene.sync_views(device, pipelines, grid, frame)?;

        grid.set_depth_only(modes.depth_only());
        grid.reconstruct_matrices();
        for view in grid.active_views() {
            view.update_descriptor_data(frame)?;
        }
        self.culler.update(grid, scene, frame)
    }

    /// Upload the ray-eval inputs when the presentation needs a novel
    /// view. Returns the uploaded inputs for CPU-side inspection.
    pub fn prepare_ray_eval(
        &self,
        pass: &mut RayEvalPass,
        novel: &Camera,
        grid: &ViewGrid,
        atlas_resolution: UVec2,
        config: &RayEvalConfig,
        modes: &RenderModes,
        frame: &FrameContext,
    ) -> Result<Option<RayEvalInputs>> {
        if !modes.ray_eval_enabled() {
            return Ok(None);
        }
        let inputs = RayEvalInputs::gather(novel, grid, atlas_resolution, config, modes.test_pixel());
        pass.update(frame, &inputs)?;
        Ok(Some(inputs))
    }

    /// Record culling and, in novel presentations, ray evaluation
    pub fn record_compute(
        &mut self,
        frame: &FrameContext,
        grid: &ViewGrid,
        scene: &Scene,
        cull_pipeline: &dyn Pipeline,
        ray_eval: RayEvalDispatch<'_>,
        modes: &RenderModes,
    ) -> Result<()> {
        let slot = self.slots.get_mut(frame.index).ok_or_else(|| slot_out_of_range(frame.index))?;
        let cmd = slot.compute.as_mut();

        cmd.begin()?;
        self.culler.record(cmd, cull_pipeline, grid, scene, frame)?;
        if modes.ray_eval_enabled() {
            ray_eval.pass.record(cmd, ray_eval.pipeline, ray_eval.images, frame)?;
        }
        cmd.end()
    }

    /// Rasterize every active view into its atlas tile from its culled
    /// command copy, then record the composite pass
    pub fn record_graphics(
        &mut self,
        frame: &FrameContext,
        grid: &ViewGrid,
        scene: &Scene,
        raster: GridRaster<'_>,
        composite: &dyn CompositePass,
        modes: &RenderModes,
    ) -> Result<()> {
        let slot = self.slots.get_mut(frame.index).ok_or_else(|| slot_out_of_range(frame.index))?;
        let cmd = slot.graphics.as_mut();
        let pipeline = raster.pipeline;

        cmd.begin()?;
        cmd.begin_render_pass(
            raster.target,
            &[
                ClearValue::Color(BACKGROUND),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        )?;

        let mesh_count = scene.mesh_count();
        if mesh_count > 0 {
            cmd.bind_pipeline(pipeline)?;
            cmd.bind_binding_group(pipeline, sets::RENDER_SCENE, scene.render_binding_group())?;
            cmd.bind_vertex_buffer(scene.vertex_buffer(), 0)?;
            cmd.bind_index_buffer(scene.index_buffer(), 0, IndexType::U32)?;
            if let Some(materials) = raster.materials {
                cmd.bind_binding_group(pipeline, sets::RENDER_MATERIALS, materials)?;
            }

            for view in grid.active_views() {
                cmd.set_viewport(view.viewport())?;
                cmd.set_scissor(view.scissor())?;
                cmd.bind_binding_group(pipeline, sets::RENDER_VIEW, view.render_binding_group(frame)?)?;
                cmd.draw_indexed_indirect(
                    scene.view_commands(view.id(), frame.index)?,
                    0,
                    mesh_count,
                    DrawIndexedIndirectCommand::STRIDE,
                )?;
            }
        }

        cmd.end_render_pass()?;
        composite.record(cmd, modes, frame)?;
        cmd.end()
    }

    /// Submit compute, then graphics gated on it. The graphics submission
    /// signals the slot's fence.
    pub fn submit(&self, device: &dyn GraphicsDevice, frame: &FrameContext) -> Result<()> {
        let slot = self.slot(frame.index)?;

        device.submit(&SubmitInfo {
            queue: QueueKind::Compute,
            command_lists: &[slot.compute.as_ref()],
            wait_semaphores: &[],
            signal_semaphores: &[slot.compute_done.as_ref()],
            fence: None,
        })?;

        // Indirect draws are the first graphics consumers of compute output
        device.submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_lists: &[slot.graphics.as_ref()],
            wait_semaphores: &[(slot.compute_done.as_ref(), PipelineStage::DrawIndirect)],
            signal_semaphores: &[],
            fence: Some(slot.fence.as_ref()),
        })
    }

    pub fn end_frame(&mut self) {
        self.index = (self.index + 1) % self.slots.len();
        self.number += 1;
    }

    /// Block until every slot's last submission completed
    pub fn wait_all(&self) -> Result<()> {
        for slot in &self.slots {
            slot.fence.wait(self.fence_timeout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
