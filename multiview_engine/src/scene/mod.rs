//! Scene module
//!
//! Static geometry shared by every view, the stable indirect draw
//! commands, and the per-view command copies the culling stage rewrites.

mod scene;

pub use scene::{MeshDesc, Scene, SceneDesc, Vertex};
