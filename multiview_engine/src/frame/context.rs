/// Per-frame context passed explicitly into every per-frame operation.

use crate::config::MAX_FRAMES_IN_FLIGHT;

/// Identifies the frame being recorded
///
/// `index` selects the frame-in-flight slot whose resources are used.
/// `number` counts frames since the orchestrator was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub index: usize,
    pub number: u64,
    pub frames_in_flight: usize,
}

impl FrameContext {
    pub fn new(index: usize, number: u64, frames_in_flight: usize) -> Self {
        debug_assert!(index < frames_in_flight);
        Self { index, number, frames_in_flight }
    }
}

/// Which frame slots a resource release applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSlot {
    Index(usize),
    All,
}

/// Set of frame slots, one bit per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMask(u32);

impl FrameMask {
    pub const EMPTY: FrameMask = FrameMask(0);

    /// Mask covering slots `0..frames`
    pub fn all(frames: usize) -> Self {
        debug_assert!(frames <= MAX_FRAMES_IN_FLIGHT);
        if frames >= 32 {
            FrameMask(u32::MAX)
        } else {
            FrameMask((1u32 << frames) - 1)
        }
    }

    pub fn with(self, index: usize) -> Self {
        debug_assert!(index < MAX_FRAMES_IN_FLIGHT);
        FrameMask(self.0 | (1u32 << index))
    }

    pub fn contains(self, index: usize) -> bool {
        index < MAX_FRAMES_IN_FLIGHT && self.0 & (1u32 << index) != 0
    }

    /// Whether every slot in `0..frames` is set
    pub fn is_complete(self, frames: usize) -> bool {
        let all = Self::all(frames).0;
        self.0 & all == all
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
