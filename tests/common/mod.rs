#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use deferred::lab::{LabConfig, LabHost, MemoryConsole};
use deferred::{Deferred, Runtime, Settlement, Value};
use parking_lot::Mutex;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;

const PROPTEST_SEED_ENV: &str = "DEFERRED_PROPTEST_SEED";
const PROPTEST_CASES_ENV: &str = "DEFERRED_PROPTEST_CASES";

/// Build a ProptestConfig with deterministic seed support for CI.
///
/// `DEFERRED_PROPTEST_CASES` overrides `cases`.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let cases = std::env::var(PROPTEST_CASES_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(cases);
    let mut config = ProptestConfig::with_cases(cases);

    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
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

/// Create a lab host and a runtime scheduling onto it.
#[must_use]
pub fn test_lab() -> (Arc<LabHost>, Runtime) {
    init_test_logging();
    let host = Arc::new(LabHost::new(LabConfig::default()));
    let runtime = host.runtime();
    (host, runtime)
}

/// Create a recording console.
#[must_use]
pub fn test_console() -> Arc<MemoryConsole> {
    Arc::new(MemoryConsole::new())
}

/// Shared log of events observed by callbacks.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    /// Returns a copy of all events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Attaches a pass-through continuation to `d` that records
    /// `"{label}:ok:{value}"` or `"{label}:err:{reason}"`.
    pub fn observe(&self, d: &Deferred, label: &str) -> Deferred {
        let on_ok = {
            let log = self.clone();
            let label = label.to_string();
            move |value: Value| {
                log.push(format!("{label}:ok:{value}"));
                Ok(value)
            }
        };
        let on_err = {
            let log = self.clone();
            let label = label.to_string();
            move |reason: Value| {
                log.push(format!("{label}:err:{reason}"));
                Err(reason)
            }
        };
        d.then(
            Some(deferred::Callback::new(on_ok)),
            Some(deferred::Callback::new(on_err)),
        )
    }
}

/// Returns the fulfilled value, panicking otherwise.
#[must_use]
pub fn fulfilled(d: &Deferred) -> Value {
    match d.settlement() {
        Some(Settlement::Fulfilled(value)) => value,
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

/// Returns the rejection reason, panicking otherwise.
#[must_use]
pub fn rejected(d: &Deferred) -> Value {
    match d.settlement() {
        Some(Settlement::Rejected(reason)) => reason,
        other => panic!("expected rejected, got {other:?}"),
    }
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
