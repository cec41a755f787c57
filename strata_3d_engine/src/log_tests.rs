use super::*;
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Capture logger storing entries for inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(Box::new(CaptureLogger { entries: entries.clone() }));
    entries
}

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_severity_from_env_str() {
    assert_eq!(LogSeverity::from_env_str("trace"), Some(LogSeverity::Trace));
    assert_eq!(LogSeverity::from_env_str("DEBUG"), Some(LogSeverity::Debug));
    assert_eq!(LogSeverity::from_env_str("warning"), Some(LogSeverity::Warn));
    assert_eq!(LogSeverity::from_env_str("Error"), Some(LogSeverity::Error));
    assert_eq!(LogSeverity::from_env_str("verbose"), None);
}

#[test]
#[serial]
fn test_log_reaches_installed_logger() {
    let entries = install_capture();
    set_max_severity(LogSeverity::Trace);

    crate::engine_info!("strata3d::Test", "hello {}", 42);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "strata3d::Test");
    assert_eq!(captured[0].message, "hello 42");
    assert!(captured[0].file.is_none());
}

#[test]
#[serial]
fn test_max_severity_filters() {
    let entries = install_capture();
    set_max_severity(LogSeverity::Warn);

    crate::engine_debug!("strata3d::Test", "dropped");
    crate::engine_info!("strata3d::Test", "dropped too");
    crate::engine_warn!("strata3d::Test", "kept");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Warn);

    drop(captured);
    set_max_severity(LogSeverity::Info);
}

#[test]
#[serial]
fn test_error_macro_carries_location() {
    let entries = install_capture();
    set_max_severity(LogSeverity::Trace);

    crate::engine_error!("strata3d::Test", "boom");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert!(captured[0].file.is_some());
    assert!(captured[0].line.is_some());
}
