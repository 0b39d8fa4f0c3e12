/// Buffer - Vulkan implementation of the Buffer trait
///
/// Every buffer lives in host-visible memory (`CpuToGpu`): the engine
/// rewrites uniforms and indirect copies from the CPU each frame and reads
/// culled commands and debug records back.

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::{check_range, Buffer as RendererBuffer, BufferUsage};
use multiview_engine::engine_error;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queues)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
}

impl Buffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        usage: BufferUsage,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        }
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!("mview::vulkan::Buffer", "Buffer access failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;
        allocation
            .mapped_ptr()
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_range(self.size, offset, data.len())?;
        let mapped = self.mapped_ptr()?;
        // In range: checked against the buffer size above
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        check_range(self.size, offset, out.len())?;
        let mapped = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(mapped.add(offset as usize), out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Raw handle of a buffer created by this backend
pub(crate) fn vk_buffer(buffer: &dyn RendererBuffer) -> Result<vk::Buffer> {
    buffer
        .as_any()
        .downcast_ref::<Buffer>()
        .map(|b| b.buffer)
        .ok_or_else(|| Error::InvalidResource("buffer was not created by the Vulkan backend".to_string()))
}
