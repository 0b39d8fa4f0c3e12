/// Buffer trait and buffer descriptor

use std::any::Any;
use bytemuck::Pod;
use crate::error::{Error, Result};

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer (read/write from compute)
    Storage,
    /// Indirect draw commands, also writable as a storage buffer
    Indirect,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name (shows up in allocator reports and logs)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn new(name: impl Into<String>, size: u64, usage: BufferUsage) -> Self {
        Self { name: name.into(), size, usage }
    }
}

/// Host-visible GPU buffer
///
/// Buffers are owned by exactly one logical owner (a View, the Scene, a
/// pass) and handed back to `GraphicsDevice::destroy_buffer` once no frame
/// in flight can read them.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    fn usage(&self) -> BufferUsage;

    /// Write `data` at `offset`
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `out.len()` bytes starting at `offset`
    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Check that `[offset, offset + len)` fits in a buffer of `size` bytes
pub fn check_range(size: u64, offset: u64, len: usize) -> Result<()> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidResource(format!(
            "range {}..{} exceeds buffer size {}",
            offset,
            offset.saturating_add(len as u64),
            size
        ))),
    }
}

/// Write a slice of plain-old-data values at `offset`
pub fn upload<T: Pod>(buffer: &dyn Buffer, offset: u64, data: &[T]) -> Result<()> {
    buffer.update(offset, bytemuck::cast_slice(data))
}

/// Read `count` plain-old-data values starting at `offset`
pub fn read_back<T: Pod>(buffer: &dyn Buffer, offset: u64, count: usize) -> Result<Vec<T>> {
    let mut values = vec![<T as bytemuck::Zeroable>::zeroed(); count];
    buffer.read(offset, bytemuck::cast_slice_mut(&mut values))?;
    Ok(values)
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
