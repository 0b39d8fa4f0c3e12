/// Fence and Semaphore traits
///
/// A fence tells the CPU that a frame slot's submissions finished. A
/// semaphore orders the compute stream before the graphics stream.

use std::any::Any;
use std::time::Duration;
use crate::error::Result;

pub trait Fence: Send + Sync {
    /// Block until signaled. `None` waits indefinitely, `Some` fails with
    /// `Error::Timeout` on expiry.
    fn wait(&self, timeout: Option<Duration>) -> Result<()>;

    fn reset(&self) -> Result<()>;

    fn is_signaled(&self) -> Result<bool>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

pub trait Semaphore: Send + Sync {
    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
