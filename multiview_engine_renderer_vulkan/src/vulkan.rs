/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Creates buffers, binding groups, command lists and sync objects on an
/// application-owned device, and submits the frame's compute and graphics
/// streams to their queues.

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::{
    BindingGroup as RendererBindingGroup, BindingResource, Buffer as RendererBuffer, BufferDesc,
    BufferUsage, ClearValue, CommandList as RendererCommandList, Fence as RendererFence,
    GraphicsDevice, IndexType, Pipeline as RendererPipeline, PipelineBindPoint, PipelineStage,
    QueueKind, Semaphore as RendererSemaphore, SubmitInfo,
};
use multiview_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info};
use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::{Arc, Mutex};

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::{vk_buffer, Buffer};
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{lock, GpuContext, QueueInfo};
use crate::vulkan_descriptor_pool::DescriptorAllocator;
use crate::vulkan_pipeline::vk_pipeline;
use crate::vulkan_sync::{vk_fence, vk_semaphore, Fence, Semaphore};

const SOURCE: &str = "mview::vulkan";

// ===== CONVERSIONS =====

/// Indirect buffers are written by the cull shader, so they are storage
/// buffers too
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let usage = match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
        BufferUsage::Indirect => vk::BufferUsageFlags::INDIRECT_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER,
    };
    usage | vk::BufferUsageFlags::TRANSFER_DST
}

pub(crate) fn binding_resource_to_vk(resource: &BindingResource) -> vk::DescriptorType {
    match resource {
        BindingResource::UniformBuffer(_) => vk::DescriptorType::UNIFORM_BUFFER,
        BindingResource::StorageBuffer(_) => vk::DescriptorType::STORAGE_BUFFER,
    }
}

pub(crate) fn pipeline_stage_to_vk(stage: PipelineStage) -> vk::PipelineStageFlags {
    match stage {
        PipelineStage::ComputeShader => vk::PipelineStageFlags::COMPUTE_SHADER,
        PipelineStage::DrawIndirect => vk::PipelineStageFlags::DRAW_INDIRECT,
        PipelineStage::VertexShader => vk::PipelineStageFlags::VERTEX_SHADER,
        PipelineStage::FragmentShader => vk::PipelineStageFlags::FRAGMENT_SHADER,
        PipelineStage::ColorAttachmentOutput => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    }
}

/// Writes a stage makes that a later stage may depend on
pub(crate) fn stage_write_access(stage: PipelineStage) -> vk::AccessFlags {
    match stage {
        PipelineStage::ComputeShader
        | PipelineStage::VertexShader
        | PipelineStage::FragmentShader => vk::AccessFlags::SHADER_WRITE,
        PipelineStage::ColorAttachmentOutput => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        PipelineStage::DrawIndirect => vk::AccessFlags::empty(),
    }
}

/// Reads a stage performs on data written earlier
pub(crate) fn stage_read_access(stage: PipelineStage) -> vk::AccessFlags {
    match stage {
        PipelineStage::ComputeShader => vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
        PipelineStage::DrawIndirect => vk::AccessFlags::INDIRECT_COMMAND_READ,
        PipelineStage::VertexShader | PipelineStage::FragmentShader => {
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::UNIFORM_READ
        }
        PipelineStage::ColorAttachmentOutput => {
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        }
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub(crate) fn bind_point_to_vk(bind_point: PipelineBindPoint) -> vk::PipelineBindPoint {
    match bind_point {
        PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
        PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
    }
}

pub(crate) fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue { float32: *color },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
        },
    }
}

/// Sharing mode for buffers read by both streams
pub(crate) fn sharing_mode(queue_families: &[u32]) -> vk::SharingMode {
    if queue_families.len() > 1 {
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    }
}

// ===== DEVICE =====

pub struct VulkanGraphicsDevice {
    /// Shared GPU context for all resources
    ctx: Arc<GpuContext>,
    descriptors: Mutex<DescriptorAllocator>,
}

impl VulkanGraphicsDevice {
    /// Build the backend on an application-owned device
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance the device was created from
    /// * `physical_device` - Physical device behind `device`
    /// * `device` - Logical device; it must outlive every object this backend creates
    /// * `graphics` - Graphics queue and family
    /// * `compute` - Compute queue and family (may equal `graphics`)
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        graphics: QueueInfo,
        compute: QueueInfo,
    ) -> Result<Self> {
        let ctx = Arc::new(GpuContext::new(instance, physical_device, device, graphics, compute)?);
        let descriptors = DescriptorAllocator::new(&ctx.device)?;

        engine_info!(
            SOURCE,
            "Vulkan device ready (graphics family {}, compute family {})",
            graphics.family,
            compute.family
        );

        Ok(Self { ctx, descriptors: Mutex::new(descriptors) })
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Number of descriptor pools created so far
    pub fn descriptor_pool_count(&self) -> Result<usize> {
        Ok(lock(&self.descriptors, "descriptor allocator")?.pool_count())
    }

    fn command_buffer(list: &dyn RendererCommandList, queue: QueueKind) -> Result<vk::CommandBuffer> {
        let vk_list = list
            .as_any()
            .downcast_ref::<CommandList>()
            .ok_or_else(|| Error::InvalidResource("command list was not created by the Vulkan backend".to_string()))?;
        if vk_list.queue() != queue {
            engine_bail!(
                SOURCE,
                "{:?} command list submitted to the {:?} queue",
                vk_list.queue(),
                queue
            );
        }
        Ok(vk_list.command_buffer())
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn RendererBuffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("buffer '{}' has zero size", desc.name)));
        }

        let device = &self.ctx.device;
        let families = self.ctx.queue_families();
        let buffer_create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(sharing_mode(&families))
            .queue_family_indices(&families);

        unsafe {
            let buffer = device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer '{}' of {} bytes: {:?}", desc.name, desc.size, e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = lock(&self.ctx.allocator, "allocator")?;
                allocator.allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for buffer '{}' (required: {:.2} MB)", desc.name, size_mb);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                device.destroy_buffer(buffer, None);
                return Err(engine_err!(SOURCE, "Failed to bind memory of buffer '{}': {:?}", desc.name, e));
            }

            Ok(Box::new(Buffer::new(Arc::clone(&self.ctx), buffer, allocation, desc.size, desc.usage)))
        }
    }

    fn destroy_buffer(&self, buffer: Box<dyn RendererBuffer>) -> Result<()> {
        // Reject foreign buffers instead of silently dropping them
        vk_buffer(buffer.as_ref())?;
        drop(buffer);
        Ok(())
    }

    fn create_binding_group(
        &self,
        pipeline: &dyn RendererPipeline,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Box<dyn RendererBindingGroup>> {
        let layout = vk_pipeline(pipeline)?.set_layout(set_index).map_err(|e| {
            engine_error!(SOURCE, "create_binding_group: {}", e);
            e
        })?;

        let (descriptor_set, pool) = lock(&self.descriptors, "descriptor allocator")?.allocate(&self.ctx.device, layout)?;

        // Kept alive until update_descriptor_sets returns
        let buffer_infos = resources
            .iter()
            .map(|resource| {
                Ok(vk::DescriptorBufferInfo::default()
                    .buffer(vk_buffer(resource.buffer())?)
                    .offset(0)
                    .range(vk::WHOLE_SIZE))
            })
            .collect::<Result<Vec<_>>>()?;

        let writes: Vec<vk::WriteDescriptorSet> = resources
            .iter()
            .zip(&buffer_infos)
            .enumerate()
            .map(|(binding, (resource, info))| {
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(binding as u32)
                    .dst_array_element(0)
                    .descriptor_type(binding_resource_to_vk(resource))
                    .buffer_info(std::slice::from_ref(info))
            })
            .collect();

        unsafe {
            self.ctx.device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Box::new(BindingGroup::allocated(descriptor_set, pool, set_index)))
    }

    fn destroy_binding_group(&self, group: Box<dyn RendererBindingGroup>) -> Result<()> {
        let vk_group = group
            .as_any()
            .downcast_ref::<BindingGroup>()
            .ok_or_else(|| Error::InvalidResource("binding group was not created by the Vulkan backend".to_string()))?;

        match vk_group.pool {
            Some(pool) => lock(&self.descriptors, "descriptor allocator")?.free(&self.ctx.device, vk_group.descriptor_set, pool),
            None => {
                engine_debug!(SOURCE, "Wrapped binding group released without freeing its set");
                Ok(())
            }
        }
    }

    fn create_command_list(&self, queue: QueueKind) -> Result<Box<dyn RendererCommandList>> {
        let family = self.ctx.queue(queue).family;
        Ok(Box::new(CommandList::new(&self.ctx.device, queue, family)?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn RendererFence>> {
        Ok(Box::new(Fence::new(&self.ctx.device, signaled)?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn RendererSemaphore>> {
        Ok(Box::new(Semaphore::new(&self.ctx.device)?))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let command_buffers = info
            .command_lists
            .iter()
            .map(|list| Self::command_buffer(*list, info.queue))
            .collect::<Result<Vec<_>>>()?;

        let mut wait_semaphores = Vec::with_capacity(info.wait_semaphores.len());
        let mut wait_stages = Vec::with_capacity(info.wait_semaphores.len());
        for (semaphore, stage) in info.wait_semaphores {
            wait_semaphores.push(vk_semaphore(*semaphore)?);
            wait_stages.push(pipeline_stage_to_vk(*stage));
        }

        let signal_semaphores = info
            .signal_semaphores
            .iter()
            .map(|s| vk_semaphore(*s))
            .collect::<Result<Vec<_>>>()?;

        let fence = match info.fence {
            Some(fence) => vk_fence(fence)?,
            None => vk::Fence::null(),
        };

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let queue = self.ctx.queue(info.queue).queue;
        let _guard = self.ctx.lock_submit()?;
        unsafe {
            self.ctx
                .device
                .queue_submit(queue, &[submit_info], fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit to the {:?} queue: {:?}", info.queue, e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        // Pools go now; buffers still alive keep the allocator through their Arc
        if let Ok(descriptors) = self.descriptors.get_mut() {
            descriptors.destroy(&self.ctx.device);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_conversion_tests.rs"]
mod tests;
