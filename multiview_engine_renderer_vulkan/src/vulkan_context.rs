/// GpuContext - shared handles every Vulkan object of the backend needs
///
/// The application owns the instance and the logical device. The context
/// borrows the device (a cloned `ash::Device` function table), owns the
/// GPU memory allocator, and knows the graphics and compute queues.
///
/// Drop order: every backend object holds an `Arc<GpuContext>`, so the
/// allocator is freed once the last buffer is gone. The application must
/// destroy the logical device only after that.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::QueueKind;
use multiview_engine::engine_error;
use std::sync::{Mutex, MutexGuard};

/// A queue handed over by the application, with its family index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    pub queue: vk::Queue,
    pub family: u32,
}

pub struct GpuContext {
    /// Vulkan logical device (owned by the application)
    pub device: ash::Device,

    /// GPU memory allocator, shared by every buffer
    pub allocator: Mutex<Allocator>,

    pub graphics: QueueInfo,
    pub compute: QueueInfo,

    /// Queues are externally synchronized, and graphics and compute may be
    /// the same queue
    submit_lock: Mutex<()>,
}

impl GpuContext {
    /// Wrap an externally created device
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance the device was created from
    /// * `physical_device` - Physical device behind `device`
    /// * `device` - Logical device
    /// * `graphics` - Queue that accepts graphics command lists
    /// * `compute` - Queue that accepts compute command lists (may equal `graphics`)
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        graphics: QueueInfo,
        compute: QueueInfo,
    ) -> Result<Self> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!("mview::vulkan", "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        Ok(Self {
            device,
            allocator: Mutex::new(allocator),
            graphics,
            compute,
            submit_lock: Mutex::new(()),
        })
    }

    pub fn queue(&self, kind: QueueKind) -> QueueInfo {
        match kind {
            QueueKind::Graphics => self.graphics,
            QueueKind::Compute => self.compute,
        }
    }

    /// Queue families buffers are shared between. One entry when graphics
    /// and compute come from the same family.
    pub fn queue_families(&self) -> Vec<u32> {
        if self.graphics.family == self.compute.family {
            vec![self.graphics.family]
        } else {
            vec![self.graphics.family, self.compute.family]
        }
    }

    pub(crate) fn lock_submit(&self) -> Result<MutexGuard<'_, ()>> {
        lock(&self.submit_lock, "queue submit")
    }
}

/// Lock a mutex, turning poisoning into a backend error
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| Error::BackendError(format!("{} lock poisoned", what)))
}
