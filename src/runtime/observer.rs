//! Instrumentation hooks.
//!
//! Observers see two events, entirely out of band from settlement:
//!
//! - `on_attach`: a continuation was attached. The deferred value passed is
//!   the terminal one, after adoption links were followed.
//! - `on_reject`: a deferred value transitioned to rejected. Waiters that
//!   were attached before the rejection are still recorded at this point.
//!
//! Several observers may be installed on one runtime; each is removed only
//! through the id returned when it was installed.
//!
//! A failing observer is logged and skipped. It never stops later observers
//! or the settlement that triggered the event.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::deferred::Deferred;
use crate::error::{Error, ErrorKind};
use crate::safe_call;
use crate::tracing_compat::{debug, warn};
use crate::value::Value;

/// Receives instrumentation events from deferred values.
pub trait DeferredObserver: Send + Sync {
    /// A continuation was attached to `deferred`.
    fn on_attach(&self, deferred: &Deferred) {
        let _ = deferred;
    }

    /// `deferred` was rejected with `reason`.
    fn on_reject(&self, deferred: &Deferred, reason: &Value) {
        let _ = (deferred, reason);
    }
}

/// Identifies an installed observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

type Entry = (ObserverId, Arc<dyn DeferredObserver>);

/// The set of observers installed on a runtime.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an observer.
    pub fn install(&self, observer: Arc<dyn DeferredObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, observer));
        debug!(observer = %id, "observer installed");
        id
    }

    /// Removes an observer. Returns false if it was not installed.
    pub fn uninstall(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        drop(entries);
        if removed {
            debug!(observer = %id, "observer uninstalled");
        }
        removed
    }

    /// Returns the number of installed observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no observers are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot so observers run without the registry lock held.
    fn snapshot(&self) -> Vec<Entry> {
        self.entries.read().clone()
    }

    pub(crate) fn notify_attach(&self, deferred: &Deferred) {
        if self.is_empty() {
            return;
        }
        for (id, observer) in self.snapshot() {
            let outcome = safe_call::call0(|| {
                observer.on_attach(deferred);
                Ok(())
            });
            log_hook_failure("on_attach", id, deferred, outcome);
        }
    }

    pub(crate) fn notify_reject(&self, deferred: &Deferred, reason: &Value) {
        if self.is_empty() {
            return;
        }
        for (id, observer) in self.snapshot() {
            let outcome = safe_call::call0(|| {
                observer.on_reject(deferred, reason);
                Ok(())
            });
            log_hook_failure("on_reject", id, deferred, outcome);
        }
    }
}

fn log_hook_failure(hook: &str, id: ObserverId, deferred: &Deferred, outcome: Result<(), Value>) {
    if let Err(reason) = outcome {
        let err = Error::new(ErrorKind::CallbackFailure)
            .with_message(format!("observer {hook} failed: {reason}"));
        warn!(observer = %id, deferred = %deferred.id(), error = %err, "observer hook failed");
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("installed", &self.len())
            .finish()
    }
}
