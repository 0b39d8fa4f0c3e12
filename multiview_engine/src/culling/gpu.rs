/// GpuCuller - records the per-view culling dispatches.
///
/// One dispatch per active view, one invocation per mesh. Each dispatch
/// reads the shared sphere buffer and the view's cull uniform, and writes
/// the view's own copy of the draw commands for this frame slot.

use crate::error::Result;
use crate::frame::FrameContext;
use crate::graphics_device::{sets, CommandList, Pipeline, PipelineStage};
use crate::grid::ViewGrid;
use crate::scene::Scene;
use crate::engine_trace;

/// `local_size_x` of `cull.comp`
pub const CULL_WORKGROUP_SIZE: u32 = 64;

/// Workgroups needed to cover `mesh_count` invocations
pub fn workgroup_count(mesh_count: u32) -> u32 {
    mesh_count.div_ceil(CULL_WORKGROUP_SIZE)
}

#[derive(Debug, Default)]
pub struct GpuCuller;

impl GpuCuller {
    pub fn new() -> Self {
        Self
    }

    /// Write every active view's cull uniform for this frame slot
    pub fn update(&self, grid: &ViewGrid, scene: &Scene, frame: &FrameContext) -> Result<()> {
        for view in grid.active_views() {
            view.update_compute_descriptor_data(frame, scene.mesh_count())?;
        }
        Ok(())
    }

    /// Record the dispatches and the barrier that makes the rewritten
    /// commands visible to indirect draws. Returns the dispatch count.
    pub fn record(
        &self,
        cmd: &mut dyn CommandList,
        pipeline: &dyn Pipeline,
        grid: &ViewGrid,
        scene: &Scene,
        frame: &FrameContext,
    ) -> Result<u32> {
        let groups = workgroup_count(scene.mesh_count());
        if groups == 0 || grid.active_views().next().is_none() {
            return Ok(0);
        }

        cmd.bind_pipeline(pipeline)?;
        cmd.bind_binding_group(pipeline, sets::CULL_SCENE, scene.cull_binding_group())?;

        let mut dispatched = 0;
        for view in grid.active_views() {
            cmd.bind_binding_group(pipeline, sets::CULL_VIEW, view.cull_binding_group(frame)?)?;
            cmd.bind_binding_group(
                pipeline,
                sets::CULL_COMMANDS,
                scene.view_commands_group(view.id(), frame.index)?,
            )?;
            cmd.dispatch(groups, 1, 1)?;
            dispatched += 1;
        }
        cmd.memory_barrier(PipelineStage::ComputeShader, PipelineStage::DrawIndirect)?;

        engine_trace!("mview::GpuCuller", "Recorded {} cull dispatches of {} groups", dispatched, groups);
        Ok(dispatched)
    }
}

#[cfg(test)]
#[path = "gpu_tests.rs"]
mod tests;
