//! Test utilities for unit tests.
//!
//! This module provides shared helpers:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Lab host constructors
//! - A lock for tests that mutate environment variables

use std::sync::{Arc, Mutex, Once};

use tracing_subscriber::fmt::format::FmtSpan;

use crate::lab::{LabConfig, LabHost, MemoryConsole};
use crate::runtime::Runtime;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Create a lab host with default configuration and a runtime on it.
#[must_use]
pub fn test_lab() -> (Arc<LabHost>, Runtime) {
    test_lab_with_config(LabConfig::default())
}

/// Create a lab host with a specific configuration and a runtime on it.
#[must_use]
pub fn test_lab_with_config(config: LabConfig) -> (Arc<LabHost>, Runtime) {
    init_test_logging();
    let host = Arc::new(LabHost::new(config));
    let runtime = host.runtime();
    (host, runtime)
}

/// Create a recording console.
#[must_use]
pub fn test_console() -> Arc<MemoryConsole> {
    Arc::new(MemoryConsole::new())
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Deferred;
    use crate::value::Value;

    #[test]
    fn test_lab_runtime_schedules_onto_host() {
        let (host, runtime) = test_lab();
        test_phase!("lab wiring");
        let _chained = Deferred::resolved(&runtime, Value::from(1)).then_ok(Ok);
        assert_eq!(host.pending_tasks(), 1);
        test_section!("drain");
        assert_eq!(host.run_until_idle(), 1);
        test_complete!("test_lab_runtime_schedules_onto_host", ran = 1);
    }

    #[test]
    fn env_lock_can_be_reacquired() {
        let guard = env_lock();
        drop(guard);
        let _again = env_lock();
        assert!(test_console().is_empty());
    }
}
