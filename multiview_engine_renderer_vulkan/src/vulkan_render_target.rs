/// RenderTarget - the atlas render pass and framebuffer
///
/// Non-owning: the application creates the atlas images, the render pass
/// and the framebuffer, and keeps them alive while the wrapper is used.

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::RenderTarget as RendererRenderTarget;
use ash::vk;
use std::any::Any;

#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl RenderTarget {
    /// `render_pass` must have a color then a depth attachment, matching
    /// the clear values the frame orchestrator records
    pub fn from_raw(render_pass: vk::RenderPass, framebuffer: vk::Framebuffer, extent: vk::Extent2D) -> Self {
        Self { render_pass, framebuffer, extent }
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl RendererRenderTarget for RenderTarget {
    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn vk_render_target(target: &dyn RendererRenderTarget) -> Result<&RenderTarget> {
    target
        .as_any()
        .downcast_ref::<RenderTarget>()
        .ok_or_else(|| Error::InvalidResource("render target was not created by the Vulkan backend".to_string()))
}
