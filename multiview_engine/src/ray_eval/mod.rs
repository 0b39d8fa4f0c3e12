//! Ray evaluation - synthesizes the novel view from the grid's atlas.
//!
//! `RayEvalPass` drives the compute shader. `RayEvaluator` is the CPU
//! reference used for inspection and tests. Both consume the same
//! `RayEvalInputs`.

mod evaluator;
mod inputs;
mod pass;

pub use evaluator::{
    encode_depth, linearize_depth, PixelDiagnostics, RayEvaluator, SourceAtlas, ViewInterval,
    AUTO_SAMPLES_PER_UNIT, BACKGROUND,
};
pub use inputs::{camera_record, eval_record, novel_camera, RayEvalInputs};
pub use pass::{dispatch_size, RayEvalPass, RAY_EVAL_WORKGROUP_SIZE};
