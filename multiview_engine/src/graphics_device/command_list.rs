/// CommandList trait - GPU command recording

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::{Buffer, BindingGroup, Pipeline, RenderTarget};

/// Command list for recording GPU commands
///
/// A command list belongs to one queue (graphics or compute). It is
/// recorded once per frame slot and submitted through the device.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (resets any previous recording)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass on the shared atlas target
    ///
    /// # Arguments
    ///
    /// * `target` - Render target (render pass + framebuffer)
    /// * `clear_values` - Clear values, one per attachment
    fn begin_render_pass(&mut self, target: &dyn RenderTarget, clear_values: &[ClearValue]) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics or compute pipeline
    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()>;

    /// Bind a binding group at a set index of the pipeline layout
    fn bind_binding_group(
        &mut self,
        pipeline: &dyn Pipeline,
        set_index: u32,
        binding_group: &dyn BindingGroup,
    ) -> Result<()>;

    /// Bind vertex buffer
    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, offset: u64) -> Result<()>;

    /// Bind index buffer
    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw from indirect indexed commands
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer holding `DrawIndexedIndirectCommand` records
    /// * `offset` - Byte offset of the first command
    /// * `draw_count` - Number of commands
    /// * `stride` - Byte stride between commands
    fn draw_indexed_indirect(&mut self, buffer: &dyn Buffer, offset: u64, draw_count: u32, stride: u32) -> Result<()>;

    /// Dispatch compute workgroups
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Global memory barrier between two pipeline stages
    fn memory_barrier(&mut self, src: PipelineStage, dst: PipelineStage) -> Result<()>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Pipeline stages used for barriers and semaphore waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ComputeShader,
    DrawIndirect,
    VertexShader,
    FragmentShader,
    ColorAttachmentOutput,
}

/// Index type for indexed drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Rectangle for scissor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for render pass attachments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}
