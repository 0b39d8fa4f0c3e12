/// CommandList - Vulkan implementation of the CommandList trait
///
/// Each list owns its command pool and one primary command buffer, bound
/// to the queue family of the stream it records (graphics or compute).

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::{
    BindingGroup as RendererBindingGroup, Buffer as RendererBuffer, ClearValue,
    CommandList as RendererCommandList, IndexType, Pipeline as RendererPipeline,
    PipelineBindPoint, PipelineStage, QueueKind, Rect2D, RenderTarget as RendererRenderTarget,
    Viewport,
};
use multiview_engine::engine_error;
use ash::vk;
use std::any::Any;

use crate::vulkan::{
    bind_point_to_vk, clear_value_to_vk, index_type_to_vk, pipeline_stage_to_vk,
    stage_read_access, stage_write_access,
};
use crate::vulkan_binding_group::vk_descriptor_set;
use crate::vulkan_buffer::vk_buffer;
use crate::vulkan_pipeline::vk_pipeline;
use crate::vulkan_render_target::vk_render_target;

const SOURCE: &str = "mview::vulkan::CommandList";

pub struct CommandList {
    device: ash::Device,
    queue: QueueKind,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
}

impl CommandList {
    /// Create a command list for `queue`
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `queue` - Stream the list is submitted to
    /// * `queue_family` - Family index of that queue
    pub(crate) fn new(device: &ash::Device, queue: QueueKind, queue_family: u32) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create command pool: {:?}", e);
                    Error::BackendError(format!("Failed to create command pool: {:?}", e))
                })?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) if !buffers.is_empty() => buffers[0],
                result => {
                    device.destroy_command_pool(command_pool, None);
                    engine_error!(SOURCE, "Failed to allocate command buffer: {:?}", result.err());
                    return Err(Error::BackendError("Failed to allocate command buffer".to_string()));
                }
            };

            Ok(Self {
                device: device.clone(),
                queue,
                command_pool,
                command_buffer,
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn queue(&self) -> QueueKind {
        self.queue
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::BackendError("Command list not recording".to_string()))
        }
    }

    fn ensure_in_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            Ok(())
        } else {
            Err(Error::BackendError("Not inside a render pass".to_string()))
        }
    }

    fn ensure_graphics(&self, what: &str) -> Result<()> {
        if self.queue == QueueKind::Graphics {
            Ok(())
        } else {
            Err(Error::BackendError(format!("{} recorded on a compute command list", what)))
        }
    }
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(&mut self, target: &dyn RendererRenderTarget, clear_values: &[ClearValue]) -> Result<()> {
        self.ensure_recording()?;
        self.ensure_graphics("begin_render_pass")?;
        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let vk_target = vk_render_target(target)?;
        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_target.render_pass)
            .framebuffer(vk_target.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk_target.extent(),
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass()?;
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn RendererPipeline) -> Result<()> {
        self.ensure_recording()?;
        if pipeline.bind_point() == PipelineBindPoint::Graphics {
            self.ensure_graphics("Graphics pipeline bind")?;
        }

        let vk_pipeline = vk_pipeline(pipeline)?;
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                bind_point_to_vk(pipeline.bind_point()),
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &dyn RendererPipeline,
        set_index: u32,
        binding_group: &dyn RendererBindingGroup,
    ) -> Result<()> {
        self.ensure_recording()?;
        if binding_group.set_index() != set_index {
            return Err(Error::InvalidResource(format!(
                "binding group created for set {} bound at set {}",
                binding_group.set_index(),
                set_index
            )));
        }

        let vk_pipeline = vk_pipeline(pipeline)?;
        let descriptor_set = vk_descriptor_set(binding_group)?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                bind_point_to_vk(pipeline.bind_point()),
                vk_pipeline.pipeline_layout,
                set_index,
                &[descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn RendererBuffer, offset: u64) -> Result<()> {
        self.ensure_recording()?;
        let vk_buffer = vk_buffer(buffer)?;
        unsafe {
            self.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn RendererBuffer, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording()?;
        let vk_buffer = vk_buffer(buffer)?;
        unsafe {
            self.device.cmd_bind_index_buffer(self.command_buffer, vk_buffer, offset, index_type_to_vk(index_type));
        }
        Ok(())
    }

    fn draw_indexed_indirect(&mut self, buffer: &dyn RendererBuffer, offset: u64, draw_count: u32, stride: u32) -> Result<()> {
        self.ensure_in_render_pass()?;
        let vk_buffer = vk_buffer(buffer)?;
        unsafe {
            self.device.cmd_draw_indexed_indirect(self.command_buffer, vk_buffer, offset, draw_count, stride);
        }
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Dispatch inside a render pass".to_string()));
        }
        unsafe {
            self.device.cmd_dispatch(self.command_buffer, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn memory_barrier(&mut self, src: PipelineStage, dst: PipelineStage) -> Result<()> {
        self.ensure_recording()?;

        let barrier = vk::MemoryBarrier::default()
            .src_access_mask(stage_write_access(src))
            .dst_access_mask(stage_read_access(dst));

        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                pipeline_stage_to_vk(src),
                pipeline_stage_to_vk(dst),
                vk::DependencyFlags::empty(),
                &[barrier],
                &[],
                &[],
            );
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with it
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
