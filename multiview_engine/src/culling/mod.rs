//! Culling stage - per-view frustum culling of the indirect draw commands.

mod cpu;
mod gpu;

pub use cpu::{cpu_cull, cull_kernel, cull_kernel_dispatch};
pub use gpu::{workgroup_count, GpuCuller, CULL_WORKGROUP_SIZE};
