//! Tests for VulkanGraphicsDevice on a real device
//!
//! They create a headless instance and device, so they need a GPU and
//! are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use std::time::Duration;
use ash::vk;
use multiview_engine::mview::Error;
use multiview_engine::mview::device::{
    read_back, upload, Buffer, BufferDesc, BufferUsage, CommandList, Fence, GraphicsDevice,
    PipelineStage, QueueKind, SubmitInfo,
};
use multiview_engine_renderer_vulkan::mview::vulkan::{QueueInfo, VulkanGraphicsDevice};

/// Instance and device kept alive for the duration of a test
struct Headless {
    _entry: ash::Entry,
    instance: ash::Instance,
    device: ash::Device,
    graphics: Option<VulkanGraphicsDevice>,
}

impl Headless {
    fn new() -> Self {
        unsafe {
            let entry = ash::Entry::load().unwrap();
            let app_info = vk::ApplicationInfo::default()
                .application_name(c"multiview_engine tests")
                .api_version(vk::API_VERSION_1_2);
            let instance = entry
                .create_instance(&vk::InstanceCreateInfo::default().application_info(&app_info), None)
                .unwrap();

            let physical_device = instance.enumerate_physical_devices().unwrap()[0];
            let family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE))
                .unwrap() as u32;

            let priorities = [1.0];
            let queue_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities)];
            let device = instance
                .create_device(physical_device, &vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos), None)
                .unwrap();

            let queue = QueueInfo { queue: device.get_device_queue(family, 0), family };
            let graphics = VulkanGraphicsDevice::new(&instance, physical_device, device.clone(), queue, queue).unwrap();

            Self { _entry: entry, instance, device, graphics: Some(graphics) }
        }
    }

    fn gpu(&self) -> &VulkanGraphicsDevice {
        self.graphics.as_ref().unwrap()
    }
}

impl Drop for Headless {
    fn drop(&mut self) {
        self.graphics = None;
        unsafe {
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_write_then_read() {
    let rig = Headless::new();
    let buffer = rig.gpu().create_buffer(BufferDesc::new("values", 64, BufferUsage::Storage)).unwrap();

    upload(buffer.as_ref(), 16, &[1u32, 2, 3, 4]).unwrap();
    assert_eq!(read_back::<u32>(buffer.as_ref(), 16, 4).unwrap(), vec![1, 2, 3, 4]);

    rig.gpu().destroy_buffer(buffer).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_rejects_out_of_range_write() {
    let rig = Headless::new();
    let buffer = rig.gpu().create_buffer(BufferDesc::new("small", 8, BufferUsage::Uniform)).unwrap();

    let result = buffer.update(4, &[0u8; 8]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_zero_sized_buffer_is_rejected() {
    let rig = Headless::new();
    let result = rig.gpu().create_buffer(BufferDesc::new("empty", 0, BufferUsage::Indirect));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

// ============================================================================
// SYNC AND SUBMISSION
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_unsignaled_fence_times_out() {
    let rig = Headless::new();
    let fence = rig.gpu().create_fence(false).unwrap();

    assert!(!fence.is_signaled().unwrap());
    let result = fence.wait(Some(Duration::from_millis(1)));
    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_submit_signals_fence() {
    let rig = Headless::new();
    let gpu = rig.gpu();
    let mut compute = gpu.create_command_list(QueueKind::Compute).unwrap();
    let mut graphics = gpu.create_command_list(QueueKind::Graphics).unwrap();
    let semaphore = gpu.create_semaphore().unwrap();
    let fence = gpu.create_fence(false).unwrap();

    compute.begin().unwrap();
    compute.end().unwrap();
    graphics.begin().unwrap();
    graphics.end().unwrap();

    gpu.submit(&SubmitInfo {
        queue: QueueKind::Compute,
        command_lists: &[compute.as_ref()],
        wait_semaphores: &[],
        signal_semaphores: &[semaphore.as_ref()],
        fence: None,
    })
    .unwrap();
    gpu.submit(&SubmitInfo {
        queue: QueueKind::Graphics,
        command_lists: &[graphics.as_ref()],
        wait_semaphores: &[(semaphore.as_ref(), PipelineStage::DrawIndirect)],
        signal_semaphores: &[],
        fence: Some(fence.as_ref()),
    })
    .unwrap();

    fence.wait(Some(Duration::from_secs(5))).unwrap();
    assert!(fence.is_signaled().unwrap());
    gpu.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_command_list_queue_mismatch_is_rejected() {
    let rig = Headless::new();
    let gpu = rig.gpu();
    let mut compute = gpu.create_command_list(QueueKind::Compute).unwrap();
    compute.begin().unwrap();
    compute.end().unwrap();

    let result = gpu.submit(&SubmitInfo {
        queue: QueueKind::Graphics,
        command_lists: &[compute.as_ref()],
        wait_semaphores: &[],
        signal_semaphores: &[],
        fence: None,
    });
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_render_pass_rejected_on_compute_list() {
    use multiview_engine_renderer_vulkan::mview::vulkan::RenderTarget;

    let rig = Headless::new();
    let mut compute = rig.gpu().create_command_list(QueueKind::Compute).unwrap();
    let target = RenderTarget::from_raw(vk::RenderPass::null(), vk::Framebuffer::null(), vk::Extent2D { width: 4, height: 4 });

    compute.begin().unwrap();
    assert!(compute.begin_render_pass(&target, &[]).is_err());
    compute.end().unwrap();
}
