/// RenderTarget trait - an externally created render pass + framebuffer
///
/// The shared color/depth atlas that every grid view rasterizes into.

use std::any::Any;

pub trait RenderTarget: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
