//! Integration tests for the engine logging system
//!
//! Routes engine logs to a capturing logger and checks what the public
//! API reports. No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use multiview_engine::glam::UVec2;
use multiview_engine::mview::Engine;
use multiview_engine::mview::frame::{Presentation, RenderModes};
use multiview_engine::mview::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use multiview_engine::{engine_err, engine_warn};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "test::module");
    assert_eq!(captured[0].message, "Test info message");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].file, Some("test_file.rs"));
    assert_eq!(captured[0].line, Some(42));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());
    Engine::reset_logger();
    // Goes to the default logger, not captured
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_macros_tag_source() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    engine_warn!("test::macros", "row {} rejected", 3);
    let err = engine_err!("test::macros", "buffer {} lost", "scene_meshes");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Warn);
    assert_eq!(captured[0].message, "row 3 rejected");
    assert_eq!(captured[0].file, None);
    assert_eq!(captured[1].severity, LogSeverity::Error);
    assert_eq!(captured[1].source, "test::macros");
    assert!(captured[1].file.is_some());
    assert_eq!(err.to_string(), "Backend error: buffer scene_meshes lost");
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_rejected_mode_change_warns() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let mut modes = RenderModes::new();
    assert!(!modes.set_test_pixel(UVec2::new(2, 2)));

    modes.set_presentation(Presentation::NovelView);
    assert!(modes.set_test_pixel(UVec2::new(2, 2)));
    modes.set_presentation(Presentation::ViewGrid);

    let captured = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
    assert_eq!(severities, vec![LogSeverity::Warn, LogSeverity::Info]);
    assert!(captured.iter().all(|e| e.source == "mview::RenderModes"));
    drop(captured);

    Engine::reset_logger();
}

#[test]
fn test_integration_default_logger_threshold() {
    let logger = DefaultLogger::default();
    assert_eq!(logger.min_severity(), LogSeverity::Debug);
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(logger.accepts(LogSeverity::Error));
}
