/// Graphics device module - GPU abstraction consumed by the core
///
/// The application creates the device, pipelines and render targets.
/// The core only creates buffers and binding groups through these traits,
/// records command lists, and submits them.

pub mod graphics_device;
pub mod buffer;
pub mod binding_group;
pub mod command_list;
pub mod pipeline;
pub mod render_target;
pub mod sync;

pub use graphics_device::*;
pub use buffer::*;
pub use binding_group::*;
pub use command_list::*;
pub use pipeline::*;
pub use render_target::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
