/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// The application builds the render, cull and ray-eval pipelines and
/// hands the handles over. The wrapper owns them from then on.

use multiview_engine::mview::{Error, Result};
use multiview_engine::mview::device::{Pipeline as RendererPipeline, PipelineBindPoint};
use ash::vk;
use std::any::Any;

pub struct Pipeline {
    /// Vulkan device (for cleanup)
    device: ash::Device,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// One layout per set index, used to allocate binding groups
    pub(crate) descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    bind_point: PipelineBindPoint,
}

impl Pipeline {
    /// Take ownership of a pipeline, its layout and its set layouts
    ///
    /// # Safety
    ///
    /// The handles must come from `device`, and `descriptor_set_layouts`
    /// must be the layouts `pipeline_layout` was created with, in set order.
    pub unsafe fn from_raw(
        device: &ash::Device,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
        bind_point: PipelineBindPoint,
    ) -> Self {
        Self {
            device: device.clone(),
            pipeline,
            pipeline_layout,
            descriptor_set_layouts,
            bind_point,
        }
    }

    pub(crate) fn set_layout(&self, set_index: u32) -> Result<vk::DescriptorSetLayout> {
        self.descriptor_set_layouts
            .get(set_index as usize)
            .copied()
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "set index {} out of range (pipeline has {} layouts)",
                    set_index,
                    self.descriptor_set_layouts.len()
                ))
            })
    }
}

impl RendererPipeline for Pipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.descriptor_set_layouts.len() as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
            for layout in self.descriptor_set_layouts.drain(..) {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}

pub(crate) fn vk_pipeline(pipeline: &dyn RendererPipeline) -> Result<&Pipeline> {
    pipeline
        .as_any()
        .downcast_ref::<Pipeline>()
        .ok_or_else(|| Error::InvalidResource("pipeline was not created by the Vulkan backend".to_string()))
}
