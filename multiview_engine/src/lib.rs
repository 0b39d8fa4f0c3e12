/*!
# Multiview Engine

Core of a multi-view capture and synthesis pipeline.

A `ViewGrid` of calibrated cameras renders a static `Scene` into tiles of
one shared color/depth atlas. A compute stage culls each view's indirect
draw commands against its frustum. A second compute stage synthesizes a
novel view by marching rays through the source views' frustums and
sampling their rendered images.

This crate is platform-agnostic. GPU work goes through the traits in
`mview::device`. A backend crate (Vulkan) implements them.

## Architecture

- **Camera / Frustum**: view and projection matrices, six clipping planes
- **View**: one grid cell with its per-frame uniforms and binding groups
- **ViewGrid**: placement modes, re-tiling, staged view removal
- **Scene**: geometry, stable draw commands, per-view culled copies
- **Culling**: compute dispatch plus a CPU reference
- **RayEval**: novel view synthesis, GPU pass plus a CPU reference
- **Frame**: frame slots, render modes, command stream orchestration
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod gpu_data;
pub mod graphics_device;
pub mod camera;
pub mod view;
pub mod grid;
pub mod scene;
pub mod culling;
pub mod ray_eval;
pub mod frame;

// Main mview namespace module
pub mod mview {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade (global logger)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod config {
        pub use crate::config::*;
    }

    pub mod gpu_data {
        pub use crate::gpu_data::*;
    }

    // GPU abstraction implemented by backends
    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod view {
        pub use crate::view::*;
    }

    pub mod grid {
        pub use crate::grid::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod culling {
        pub use crate::culling::*;
    }

    pub mod ray_eval {
        pub use crate::ray_eval::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }
}

// Re-export math library at crate root
pub use glam;
