/// BindingGroup trait and binding resources
///
/// A BindingGroup is an immutable set of buffer bindings for one set index
/// of a pipeline layout. The layout comes from the pipeline, which is
/// created outside the engine.

use std::any::Any;
use crate::graphics_device::Buffer;

/// A concrete resource to bind into a BindingGroup, in binding order
pub enum BindingResource<'a> {
    /// Uniform buffer binding
    UniformBuffer(&'a dyn Buffer),
    /// Storage buffer binding
    StorageBuffer(&'a dyn Buffer),
}

impl BindingResource<'_> {
    pub fn buffer(&self) -> &dyn Buffer {
        match self {
            BindingResource::UniformBuffer(b) | BindingResource::StorageBuffer(b) => *b,
        }
    }
}

/// An immutable set of GPU resource bindings.
///
/// Create a new one to change resources.
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
