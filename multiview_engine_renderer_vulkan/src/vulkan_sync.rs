/// Fence and Semaphore - Vulkan implementations of the sync traits

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::{Fence as RendererFence, Semaphore as RendererSemaphore};
use multiview_engine::engine_err;
use ash::vk;
use std::any::Any;
use std::time::Duration;

/// Fence wait timeout in nanoseconds; `None` waits forever
pub(crate) fn timeout_nanos(timeout: Option<Duration>) -> u64 {
    match timeout {
        Some(t) => u64::try_from(t.as_nanos()).unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

pub struct Fence {
    device: ash::Device,
    pub(crate) fence: vk::Fence,
}

impl Fence {
    pub(crate) fn new(device: &ash::Device, signaled: bool) -> Result<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            device
                .create_fence(&info, None)
                .map_err(|e| engine_err!("mview::vulkan::Fence", "Failed to create fence: {:?}", e))?
        };
        Ok(Self { device: device.clone(), fence })
    }
}

impl RendererFence for Fence {
    fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let result = unsafe { self.device.wait_for_fences(&[self.fence], true, timeout_nanos(timeout)) };
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(Error::Timeout(format!("fence wait exceeded {:?}", timeout))),
            Err(e) => Err(engine_err!("mview::vulkan::Fence", "Failed to wait for fence: {:?}", e)),
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(|e| engine_err!("mview::vulkan::Fence", "Failed to reset fence: {:?}", e))
        }
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.device
                .get_fence_status(self.fence)
                .map_err(|e| engine_err!("mview::vulkan::Fence", "Failed to query fence: {:?}", e))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

pub struct Semaphore {
    device: ash::Device,
    pub(crate) semaphore: vk::Semaphore,
}

impl Semaphore {
    pub(crate) fn new(device: &ash::Device) -> Result<Self> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            device
                .create_semaphore(&info, None)
                .map_err(|e| engine_err!("mview::vulkan::Semaphore", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Self { device: device.clone(), semaphore })
    }
}

impl RendererSemaphore for Semaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

pub(crate) fn vk_fence(fence: &dyn RendererFence) -> Result<vk::Fence> {
    fence
        .as_any()
        .downcast_ref::<Fence>()
        .map(|f| f.fence)
        .ok_or_else(|| Error::InvalidResource("fence was not created by the Vulkan backend".to_string()))
}

pub(crate) fn vk_semaphore(semaphore: &dyn RendererSemaphore) -> Result<vk::Semaphore> {
    semaphore
        .as_any()
        .downcast_ref::<Semaphore>()
        .map(|s| s.semaphore)
        .ok_or_else(|| Error::InvalidResource("semaphore was not created by the Vulkan backend".to_string()))
}
