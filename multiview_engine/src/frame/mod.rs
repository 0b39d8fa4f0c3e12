//! Frame orchestration - frame slots, render modes and the per-frame
//! recording of both command streams.

mod context;
mod modes;
mod orchestrator;

pub use context::{FrameContext, FrameMask, FrameSlot};
pub use modes::{Presentation, RenderModes};
pub use orchestrator::{CompositePass, FrameOrchestrator, GridRaster, RayEvalDispatch};
