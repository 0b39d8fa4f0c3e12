//! Unit tests for error.rs
//!
//! Tests all Error variants, their Display output, and the error macros.

use crate::error::{Error, Result};
use crate::mview::log::{LogEntry, LogSeverity, Logger};
use crate::mview::Engine;
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("frame slot 3 out of range".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("frame slot 3"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no compute queue".to_string());
    assert!(format!("{}", err).starts_with("Initialization failed"));
}

#[test]
fn test_invalid_config_display() {
    let err = Error::InvalidConfig("near >= far".to_string());
    assert_eq!(format!("{}", err), "Invalid configuration: near >= far");
}

#[test]
fn test_timeout_display() {
    let err = Error::Timeout("frame fence 1".to_string());
    assert_eq!(format!("{}", err), "Timed out: frame fence 1");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::Timeout("fence".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::OutOfMemory);
}

#[test]
fn test_result_question_mark_propagates() {
    fn inner() -> Result<u32> {
        Err(Error::InvalidResource("missing".to_string()))
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert!(matches!(outer(), Err(Error::InvalidResource(_))));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String, Option<u32>)>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source != "mview::test" {
            return;
        }
        self.entries
            .lock()
            .unwrap()
            .push((entry.severity, entry.message.clone(), entry.line));
    }
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });

    let err = crate::engine_err!("mview::test", "buffer {} too small", 7);

    Engine::reset_logger();
    assert_eq!(err, Error::BackendError("buffer 7 too small".to_string()));
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, LogSeverity::Error);
    assert_eq!(entries[0].1, "buffer 7 too small");
    assert!(entries[0].2.is_some());
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });

    fn guarded(value: u32) -> Result<u32> {
        if value == 0 {
            crate::engine_bail!("mview::test", "value must be non-zero");
        }
        Ok(value * 2)
    }

    let failed = guarded(0);
    let passed = guarded(4);

    Engine::reset_logger();
    assert!(matches!(failed, Err(Error::BackendError(_))));
    assert_eq!(passed, Ok(8));
    assert_eq!(entries.lock().unwrap().len(), 1);
}
