/// Pipeline trait
///
/// Pipelines (graphics and compute) are built by the application and
/// lent to the engine for binding and binding-group creation.

use std::any::Any;

/// Which pipeline slot a pipeline binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

pub trait Pipeline: Send + Sync {
    fn bind_point(&self) -> PipelineBindPoint;

    /// Number of descriptor set layouts in the pipeline layout
    fn binding_group_layout_count(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Render and cull pipelines the core creates binding groups against
#[derive(Clone, Copy)]
pub struct StagePipelines<'a> {
    pub render: &'a dyn Pipeline,
    pub cull: &'a dyn Pipeline,
}

/// Set indices used by the engine's passes
///
/// Render pipeline: set 0 scene mesh data, set 1 per-view data, set 2
/// materials (external). Cull pipeline: set 0 bounding spheres, set 1 view
/// cull data, set 2 per-view draw commands. Ray-eval pipeline: set 0
/// evaluation data, set 1 atlas and output images (external).
pub mod sets {
    pub const RENDER_SCENE: u32 = 0;
    pub const RENDER_VIEW: u32 = 1;
    pub const RENDER_MATERIALS: u32 = 2;

    pub const CULL_SCENE: u32 = 0;
    pub const CULL_VIEW: u32 = 1;
    pub const CULL_COMMANDS: u32 = 2;

    pub const RAY_EVAL_DATA: u32 = 0;
    pub const RAY_EVAL_IMAGES: u32 = 1;
}
