/// BindingGroup - Vulkan implementation of the BindingGroup trait
///
/// Wraps a VkDescriptorSet. Groups created by the device remember the pool
/// they came from so `destroy_binding_group` can return the set. Groups
/// wrapped from raw handles (e.g. the ray-eval image set the application
/// writes itself) have no pool and are never freed by the backend.

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::BindingGroup as RendererBindingGroup;
use ash::vk;
use std::any::Any;

pub struct BindingGroup {
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// Pool the set was allocated from, None for wrapped sets
    pub(crate) pool: Option<vk::DescriptorPool>,
    set_index: u32,
}

impl BindingGroup {
    pub(crate) fn allocated(descriptor_set: vk::DescriptorSet, pool: vk::DescriptorPool, set_index: u32) -> Self {
        Self { descriptor_set, pool: Some(pool), set_index }
    }

    /// Wrap a descriptor set owned by the application
    pub fn from_raw(descriptor_set: vk::DescriptorSet, set_index: u32) -> Self {
        Self { descriptor_set, pool: None, set_index }
    }
}

impl RendererBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn vk_descriptor_set(group: &dyn RendererBindingGroup) -> Result<vk::DescriptorSet> {
    group
        .as_any()
        .downcast_ref::<BindingGroup>()
        .map(|g| g.descriptor_set)
        .ok_or_else(|| Error::InvalidResource("binding group was not created by the Vulkan backend".to_string()))
}
