//! Unhandled-rejection tracking.
//!
//! The tracker is an observer installed on a [`Runtime`]. It watches two
//! events:
//!
//! - **reject**: a deferred value with no waiters was rejected. A
//!   diagnostic record is created and a one-shot timer armed: the fast
//!   grace period for errors in [`DEFAULT_WHITELIST`], the slow one
//!   otherwise.
//! - **attach**: a continuation was attached to a rejected value that has a
//!   record. If the rejection was already reported, a "handled" notice is
//!   emitted; otherwise its timer is cancelled. The record is dropped.
//!
//! When a timer fires and the reason qualifies (`all_rejections`, or a
//! class in the configured whitelist), the rejection gets the next display
//! id and is reported through `on_unhandled` or the [`Console`].
//!
//! Reporting never influences settlement; a failing report callback is
//! logged and otherwise ignored.

pub mod config;
pub mod report;

pub use config::{
    apply_env_overrides, ConfigError, ReportCallback, TrackingOptions, DEFAULT_WHITELIST,
    ENV_ALL_REJECTIONS, ENV_WHITELIST, FAST_GRACE_PERIOD, SLOW_GRACE_PERIOD,
};
#[cfg(feature = "config-file")]
pub use config::{TrackingToml, TrackingTomlConfig};
pub use report::{handled_lines, unhandled_lines, Console, StderrConsole};

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::deferred::{Deferred, DeferredId, DeferredState};
use crate::error::{Error, ErrorKind};
use crate::runtime::{DeferredObserver, ObserverId, Runtime};
use crate::safe_call;
use crate::time::{Timer, TimerHandle};
use crate::tracing_compat::{debug, trace, warn};
use crate::value::Value;

/// Diagnostic record for one unwaited rejection.
struct Record {
    rejection_id: u64,
    display_id: Option<u64>,
    error: Value,
    timer: Option<TimerHandle>,
    logged: bool,
}

#[derive(Default)]
struct Table {
    next_rejection_id: u64,
    next_display_id: u64,
    records: HashMap<DeferredId, Record>,
}

/// State of one enabled session. Dropped on disable.
struct TrackerState {
    me: Weak<TrackerState>,
    options: TrackingOptions,
    timer: Arc<dyn Timer>,
    console: Arc<dyn Console>,
    table: Mutex<Table>,
}

impl TrackerState {
    fn new(options: TrackingOptions, timer: Arc<dyn Timer>, console: Arc<dyn Console>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            options,
            timer,
            console,
            table: Mutex::new(Table::default()),
        })
    }

    fn on_timeout(&self, key: DeferredId) {
        let report = {
            let mut guard = self.table.lock();
            let table = &mut *guard;
            let Some(record) = table.records.get_mut(&key) else {
                return;
            };
            record.timer = None;
            if self.options.should_report(&record.error) {
                let display_id = table.next_display_id;
                table.next_display_id += 1;
                record.display_id = Some(display_id);
                record.logged = true;
                Some((display_id, record.error.clone()))
            } else {
                trace!(
                    deferred = %key,
                    rejection_id = record.rejection_id,
                    "grace period expired, reason not reportable"
                );
                table.records.remove(&key);
                None
            }
        };
        if let Some((display_id, error)) = report {
            self.report_unhandled(display_id, &error);
        }
    }

    fn report_unhandled(&self, display_id: u64, error: &Value) {
        match self.options.unhandled_callback() {
            Some(callback) => {
                let outcome = safe_call::call0(|| callback(display_id, error));
                log_callback_failure("on_unhandled", display_id, outcome);
            }
            None => report::log_unhandled(self.console.as_ref(), display_id, error),
        }
    }

    fn report_handled(&self, display_id: u64, error: &Value) {
        match self.options.handled_callback() {
            Some(callback) => {
                let outcome = safe_call::call0(|| callback(display_id, error));
                log_callback_failure("on_handled", display_id, outcome);
            }
            None => report::log_handled(self.console.as_ref(), display_id),
        }
    }

    /// Cancels every outstanding timer and drops all records.
    fn shutdown(&self) {
        let records = std::mem::take(&mut self.table.lock().records);
        let mut cancelled = 0_usize;
        for record in records.into_values() {
            if let Some(handle) = record.timer {
                self.timer.clear_timeout(handle);
                cancelled += 1;
            }
        }
        debug!(cancelled, "rejection tracking state discarded");
    }

    fn record_count(&self) -> usize {
        self.table.lock().records.len()
    }
}

fn log_callback_failure(name: &str, display_id: u64, outcome: Result<(), Value>) {
    if let Err(reason) = outcome {
        let err = Error::new(ErrorKind::CallbackFailure)
            .with_message(format!("{name} callback failed: {reason}"));
        warn!(display_id, error = %err, "tracking callback failed");
    }
}

impl DeferredObserver for TrackerState {
    fn on_attach(&self, deferred: &Deferred) {
        if deferred.state() != DeferredState::Rejected {
            return;
        }
        let Some(record) = self.table.lock().records.remove(&deferred.id()) else {
            return;
        };
        if record.logged {
            if let Some(display_id) = record.display_id {
                debug!(deferred = %deferred.id(), display_id, "reported rejection handled");
                self.report_handled(display_id, &record.error);
            }
        } else if let Some(handle) = record.timer {
            trace!(deferred = %deferred.id(), timer = %handle, "rejection handled in time");
            self.timer.clear_timeout(handle);
        }
    }

    fn on_reject(&self, deferred: &Deferred, reason: &Value) {
        if deferred.has_waiters() {
            return;
        }
        let key = deferred.id();
        let rejection_id = {
            let mut table = self.table.lock();
            let rejection_id = table.next_rejection_id;
            table.next_rejection_id += 1;
            table.records.insert(
                key,
                Record {
                    rejection_id,
                    display_id: None,
                    error: reason.clone(),
                    timer: None,
                    logged: false,
                },
            );
            rejection_id
        };

        let delay = self.options.grace_period_for(reason);
        let me = self.me.clone();
        let handle = self.timer.set_timeout(
            delay,
            Box::new(move || {
                if let Some(state) = me.upgrade() {
                    state.on_timeout(key);
                }
            }),
        );
        if let Some(record) = self.table.lock().records.get_mut(&key) {
            record.timer = Some(handle);
        }
        debug!(
            deferred = %key,
            rejection_id,
            delay_ms = delay.as_millis() as u64,
            "unwaited rejection recorded"
        );
    }
}

struct Session {
    observer: ObserverId,
    state: Arc<TrackerState>,
}

/// Reports rejections that stay unhandled past a grace period.
///
/// # Example
///
/// ```ignore
/// let host = Arc::new(LabHost::default());
/// let runtime = host.runtime();
/// let tracker = RejectionTracker::new(&runtime, host.clone());
/// tracker.enable(TrackingOptions::default());
/// ```
pub struct RejectionTracker {
    runtime: Runtime,
    timer: Arc<dyn Timer>,
    console: Arc<dyn Console>,
    session: Mutex<Option<Session>>,
}

impl RejectionTracker {
    /// Creates a disabled tracker for `runtime`, using `timer` for grace
    /// periods and standard error for default reports.
    pub fn new<T: Timer + 'static>(runtime: &Runtime, timer: Arc<T>) -> Self {
        Self {
            runtime: runtime.clone(),
            timer,
            console: Arc::new(StderrConsole),
            session: Mutex::new(None),
        }
    }

    /// Replaces the console used for default reports. Takes effect on the
    /// next [`enable`](Self::enable).
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Starts tracking with `options`. Enabling while enabled first
    /// disables, discarding all records.
    pub fn enable(&self, options: TrackingOptions) {
        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            self.end(previous);
        }
        debug!(?options, "rejection tracking enabled");
        let state = TrackerState::new(options, Arc::clone(&self.timer), Arc::clone(&self.console));
        let observer = self.runtime.install_observer(state.clone());
        *session = Some(Session { observer, state });
    }

    /// Stops tracking. Returns false if tracking was not enabled.
    pub fn disable(&self) -> bool {
        let previous = self.session.lock().take();
        match previous {
            Some(session) => {
                self.end(session);
                true
            }
            None => false,
        }
    }

    /// Returns true while tracking is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Returns the number of live diagnostic records.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.session
            .lock()
            .as_ref()
            .map_or(0, |session| session.state.record_count())
    }

    fn end(&self, session: Session) {
        self.runtime.uninstall_observer(session.observer);
        session.state.shutdown();
        debug!(observer = %session.observer, "rejection tracking disabled");
    }
}

impl Drop for RejectionTracker {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            self.end(session);
        }
    }
}

impl fmt::Debug for RejectionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionTracker")
            .field("enabled", &self.is_enabled())
            .field("tracked", &self.tracked_count())
            .finish_non_exhaustive()
    }
}
