/// RenderModes - the legal combinations of presentation, debug pixel and
/// depth-only rendering.
///
/// | presentation          | ray-eval | test pixel |
/// |-----------------------|----------|------------|
/// | ViewGrid              | no       | never      |
/// | NovelView             | yes      | optional   |
/// | NovelViewSecondWindow | yes      | optional   |
///
/// Depth-only is independent of both and applies to the grid views.

use glam::UVec2;
use crate::{engine_info, engine_warn};

/// What ends up on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    /// The grid's atlas is composited directly
    #[default]
    ViewGrid,
    /// The synthesized novel view replaces the grid
    NovelView,
    /// The grid stays on the main target, the novel view goes to a second one
    NovelViewSecondWindow,
}

impl Presentation {
    pub fn produces_novel_view(self) -> bool {
        !matches!(self, Presentation::ViewGrid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderModes {
    presentation: Presentation,
    test_pixel: Option<UVec2>,
    depth_only: bool,
}

impl RenderModes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    pub fn test_pixel(&self) -> Option<UVec2> {
        self.test_pixel
    }

    pub fn depth_only(&self) -> bool {
        self.depth_only
    }

    /// Whether the ray-eval pass is dispatched this frame
    pub fn ray_eval_enabled(&self) -> bool {
        self.presentation.produces_novel_view()
    }

    pub fn set_presentation(&mut self, presentation: Presentation) {
        if presentation == self.presentation {
            return;
        }
        self.presentation = presentation;
        if !presentation.produces_novel_view() {
            if let Some(pixel) = self.test_pixel.take() {
                engine_info!(
                    "mview::RenderModes",
                    "Test pixel ({}, {}) cleared: no novel view in grid presentation",
                    pixel.x,
                    pixel.y
                );
            }
        }
    }

    /// Select the pixel whose evaluation is recorded for inspection.
    /// Returns false when no novel view is produced.
    pub fn set_test_pixel(&mut self, pixel: UVec2) -> bool {
        if !self.presentation.produces_novel_view() {
            engine_warn!(
                "mview::RenderModes",
                "Test pixel ({}, {}) rejected: no novel view in grid presentation",
                pixel.x,
                pixel.y
            );
            return false;
        }
        self.test_pixel = Some(pixel);
        true
    }

    pub fn clear_test_pixel(&mut self) {
        self.test_pixel = None;
    }

    pub fn set_depth_only(&mut self, enabled: bool) {
        self.depth_only = enabled;
    }
}

#[cfg(test)]
#[path = "modes_tests.rs"]
mod tests;
