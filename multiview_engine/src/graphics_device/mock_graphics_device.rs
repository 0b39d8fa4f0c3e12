/// Mock graphics device for unit tests (no GPU required)
///
/// Buffers keep their bytes in memory so tests can read back what the
/// engine wrote. Command lists record one string per call. The device
/// journals creations, destructions and submissions.

use std::any::Any;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::graphics_device::{
    check_range, BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage,
    ClearValue, CommandList, Fence, GraphicsDevice, IndexType, Pipeline,
    PipelineBindPoint, PipelineStage, QueueKind, Rect2D, RenderTarget, Semaphore,
    StagePipelines, SubmitInfo, Viewport,
};

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub name: String,
    pub usage: BufferUsage,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(name: impl Into<String>, size: u64, usage: BufferUsage) -> Self {
        Self {
            name: name.into(),
            usage,
            data: Mutex::new(vec![0u8; size as usize]),
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut bytes = self.data.lock().unwrap();
        check_range(bytes.len() as u64, offset, data.len())?;
        let start = offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let bytes = self.data.lock().unwrap();
        check_range(bytes.len() as u64, offset, out.len())?;
        let start = offset as usize;
        out.copy_from_slice(&bytes[start..start + out.len()]);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Debug name of a buffer created by the mock device
pub fn buffer_name(buffer: &dyn Buffer) -> String {
    buffer
        .as_any()
        .downcast_ref::<MockBuffer>()
        .map(|b| b.name.clone())
        .unwrap_or_else(|| "?".to_string())
}

// ============================================================================
// Mock BindingGroup / Pipeline / RenderTarget / sync
// ============================================================================

#[derive(Debug)]
pub struct MockBindingGroup {
    pub set_index: u32,
    /// Names of the bound buffers, in binding order
    pub resources: Vec<String>,
}

impl MockBindingGroup {
    pub fn label(&self) -> String {
        self.resources.join("+")
    }
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub name: String,
    pub bind_point: PipelineBindPoint,
    pub set_count: u32,
}

impl MockPipeline {
    pub fn graphics(name: &str) -> Self {
        Self { name: name.to_string(), bind_point: PipelineBindPoint::Graphics, set_count: 3 }
    }

    pub fn compute(name: &str) -> Self {
        Self { name: name.to_string(), bind_point: PipelineBindPoint::Compute, set_count: 3 }
    }
}

impl Pipeline for MockPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.set_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockRenderTarget {
    pub width: u32,
    pub height: u32,
}

impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockFence {
    pub signaled: AtomicBool,
    pub wait_count: AtomicUsize,
}

impl Fence for MockFence {
    fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        self.wait_count.fetch_add(1, Ordering::SeqCst);
        if self.signaled.load(Ordering::SeqCst) {
            return Ok(());
        }
        match timeout {
            Some(t) => Err(Error::Timeout(format!("mock fence after {:?}", t))),
            None => Err(Error::BackendError("mock fence would block forever".to_string())),
        }
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockSemaphore;

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

#[derive(Debug)]
pub struct MockCommandList {
    pub queue: QueueKind,
    pub commands: Vec<String>,
}

impl MockCommandList {
    pub fn new(queue: QueueKind) -> Self {
        Self { queue, commands: Vec::new() }
    }

    /// Recorded commands starting with `prefix`
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }
}

fn pipeline_name(pipeline: &dyn Pipeline) -> String {
    pipeline
        .as_any()
        .downcast_ref::<MockPipeline>()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "?".to_string())
}

fn group_label(group: &dyn BindingGroup) -> String {
    group
        .as_any()
        .downcast_ref::<MockBindingGroup>()
        .map(MockBindingGroup::label)
        .unwrap_or_else(|| "?".to_string())
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.commands.clear();
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.commands.push("end".to_string());
        Ok(())
    }

    fn begin_render_pass(&mut self, target: &dyn RenderTarget, _clear_values: &[ClearValue]) -> Result<()> {
        self.commands.push(format!("begin_render_pass({}x{})", target.width(), target.height()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(format!(
            "set_viewport({},{},{},{})",
            viewport.x, viewport.y, viewport.width, viewport.height
        ));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.commands.push(format!(
            "set_scissor({},{},{},{})",
            scissor.x, scissor.y, scissor.width, scissor.height
        ));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()> {
        self.commands.push(format!("bind_pipeline({})", pipeline_name(pipeline)));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &dyn Pipeline,
        set_index: u32,
        binding_group: &dyn BindingGroup,
    ) -> Result<()> {
        self.commands.push(format!(
            "bind_binding_group({},{})",
            set_index,
            group_label(binding_group)
        ));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, _offset: u64) -> Result<()> {
        self.commands.push(format!("bind_vertex_buffer({})", buffer_name(buffer)));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, _offset: u64, _index_type: IndexType) -> Result<()> {
        self.commands.push(format!("bind_index_buffer({})", buffer_name(buffer)));
        Ok(())
    }

    fn draw_indexed_indirect(&mut self, buffer: &dyn Buffer, offset: u64, draw_count: u32, stride: u32) -> Result<()> {
        self.commands.push(format!(
            "draw_indexed_indirect({},{},{},{})",
            buffer_name(buffer),
            offset,
            draw_count,
            stride
        ));
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.commands.push(format!("dispatch({},{},{})", x, y, z));
        Ok(())
    }

    fn memory_barrier(&mut self, src: PipelineStage, dst: PipelineStage) -> Result<()> {
        self.commands.push(format!("memory_barrier({:?}->{:?})", src, dst));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// One recorded queue submission
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub queue: QueueKind,
    pub commands: Vec<Vec<String>>,
    pub wait_count: usize,
    pub signal_count: usize,
    pub has_fence: bool,
}

#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    live_buffers: Mutex<Vec<String>>,
    destroyed_buffers: Mutex<Vec<String>>,
    live_binding_groups: AtomicUsize,
    submissions: Mutex<Vec<MockSubmission>>,
    /// When set, the next create_buffer call fails
    pub fail_next_buffer: AtomicBool,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.lock().unwrap().len()
    }

    pub fn live_buffer_names(&self) -> Vec<String> {
        self.live_buffers.lock().unwrap().clone()
    }

    pub fn destroyed_buffer_names(&self) -> Vec<String> {
        self.destroyed_buffers.lock().unwrap().clone()
    }

    pub fn live_binding_group_count(&self) -> usize {
        self.live_binding_groups.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<MockSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn Buffer>> {
        if self.fail_next_buffer.swap(false, Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        self.live_buffers.lock().unwrap().push(desc.name.clone());
        Ok(Box::new(MockBuffer::new(desc.name, desc.size, desc.usage)))
    }

    fn destroy_buffer(&self, buffer: Box<dyn Buffer>) -> Result<()> {
        let name = buffer_name(buffer.as_ref());
        let mut live = self.live_buffers.lock().unwrap();
        let pos = live
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| Error::InvalidResource(format!("buffer {} is not alive", name)))?;
        live.remove(pos);
        self.destroyed_buffers.lock().unwrap().push(name);
        Ok(())
    }

    fn create_binding_group(
        &self,
        _pipeline: &dyn Pipeline,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Box<dyn BindingGroup>> {
        self.live_binding_groups.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBindingGroup {
            set_index,
            resources: resources.iter().map(|r| buffer_name(r.buffer())).collect(),
        }))
    }

    fn destroy_binding_group(&self, _group: Box<dyn BindingGroup>) -> Result<()> {
        self.live_binding_groups.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn create_command_list(&self, queue: QueueKind) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList::new(queue)))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(MockFence {
            signaled: AtomicBool::new(signaled),
            wait_count: AtomicUsize::new(0),
        }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(MockSemaphore))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let commands = info
            .command_lists
            .iter()
            .map(|cl| {
                cl.as_any()
                    .downcast_ref::<MockCommandList>()
                    .map(|m| m.commands.clone())
                    .unwrap_or_default()
            })
            .collect();

        self.submissions.lock().unwrap().push(MockSubmission {
            queue: info.queue,
            commands,
            wait_count: info.wait_semaphores.len(),
            signal_count: info.signal_semaphores.len(),
            has_fence: info.fence.is_some(),
        });

        if let Some(fence) = info.fence {
            if let Some(mock) = fence.as_any().downcast_ref::<MockFence>() {
                mock.signaled.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock stage
// ============================================================================

/// Device plus the pipelines most tests bind against
pub struct MockStage {
    pub device: MockGraphicsDevice,
    pub render: MockPipeline,
    pub cull: MockPipeline,
    pub ray_eval: MockPipeline,
}

impl MockStage {
    pub fn new() -> Self {
        Self {
            device: MockGraphicsDevice::new(),
            render: MockPipeline::graphics("render"),
            cull: MockPipeline::compute("cull"),
            ray_eval: MockPipeline::compute("ray_eval"),
        }
    }

    pub fn pipelines(&self) -> StagePipelines<'_> {
        StagePipelines { render: &self.render, cull: &self.cull }
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
