/*!
# Multiview Engine - Vulkan Backend

Vulkan implementation of the multiview engine's GPU abstraction, using
Ash for the bindings and gpu-allocator for memory.

The application creates the instance, the logical device, the queues, the
pipelines and the atlas render target. This crate wraps them:

- `VulkanGraphicsDevice` implements `GraphicsDevice` on that device
- `Pipeline::from_raw`, `RenderTarget::from_raw` and `BindingGroup::from_raw`
  hand application-built objects to the engine
- `debug::messenger_create_info` routes validation messages into the engine log
*/

mod vulkan;
mod vulkan_context;
mod vulkan_buffer;
mod vulkan_binding_group;
mod vulkan_descriptor_pool;
mod vulkan_command_list;
mod vulkan_pipeline;
mod vulkan_render_target;
mod vulkan_sync;
pub mod debug;

pub mod mview {
    pub mod vulkan {
        pub use crate::vulkan::VulkanGraphicsDevice;
        pub use crate::vulkan_context::{GpuContext, QueueInfo};
        pub use crate::vulkan_buffer::Buffer;
        pub use crate::vulkan_binding_group::BindingGroup;
        pub use crate::vulkan_command_list::CommandList;
        pub use crate::vulkan_pipeline::Pipeline;
        pub use crate::vulkan_render_target::RenderTarget;
        pub use crate::vulkan_sync::{Fence, Semaphore};
        pub use crate::debug::{messenger_create_info, validation_stats, ValidationStats};
    }
}

pub use ash;
