/// GraphicsDevice trait - the single long-lived GPU context
///
/// Passed by reference into every engine operation that allocates,
/// releases or submits. Nothing in the engine holds on to it.

use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, BindingGroup, BindingResource, CommandList, Fence,
    Pipeline, PipelineStage, Semaphore,
};

/// Queue a command list is recorded for and submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Graphics,
    Compute,
}

/// One queue submission
pub struct SubmitInfo<'a> {
    pub queue: QueueKind,
    pub command_lists: &'a [&'a dyn CommandList],
    /// Semaphores to wait on, with the stage that waits
    pub wait_semaphores: &'a [(&'a dyn Semaphore, PipelineStage)],
    pub signal_semaphores: &'a [&'a dyn Semaphore],
    /// Fence signaled when the submission completes
    pub fence: Option<&'a dyn Fence>,
}

pub trait GraphicsDevice: Send + Sync {
    /// Create a host-visible buffer
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn Buffer>>;

    /// Release a buffer. The caller guarantees no pending GPU work reads it.
    fn destroy_buffer(&self, buffer: Box<dyn Buffer>) -> Result<()>;

    /// Create a binding group for `set_index` of the pipeline's layout
    fn create_binding_group(
        &self,
        pipeline: &dyn Pipeline,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Box<dyn BindingGroup>>;

    /// Release a binding group. Same contract as `destroy_buffer`.
    fn destroy_binding_group(&self, group: Box<dyn BindingGroup>) -> Result<()>;

    fn create_command_list(&self, queue: QueueKind) -> Result<Box<dyn CommandList>>;

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    fn submit(&self, info: &SubmitInfo) -> Result<()>;

    /// Wait for all queues to be idle
    fn wait_idle(&self) -> Result<()>;
}
