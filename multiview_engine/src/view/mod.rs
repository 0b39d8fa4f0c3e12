//! View module - a single grid viewport and its per-frame GPU resources.

mod view;

pub use view::{View, ViewId, ViewLifecycle};
