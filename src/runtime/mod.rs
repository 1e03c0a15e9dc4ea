//! Runtime context for deferred values.
//!
//! A [`Runtime`] bundles the two host capabilities every deferred value
//! needs: the [`Scheduler`] that runs continuation dispatch after the
//! current turn, and the [`ObserverRegistry`] whose hooks see attach and
//! reject events. Both are injected; nothing here assumes a particular
//! event loop.
//!
//! - [`scheduler`]: the scheduling capability and a pump-it-yourself FIFO
//! - [`observer`]: instrumentation hooks with install/uninstall lifecycle
//!
//! # Example
//!
//! ```ignore
//! use deferred::runtime::{FifoScheduler, Runtime};
//! use std::sync::Arc;
//!
//! let scheduler = Arc::new(FifoScheduler::new());
//! let runtime = Runtime::new(scheduler.clone());
//! let d = runtime.deferred(|r| { r.resolve(1.into()); Ok(()) });
//! scheduler.drain();
//! ```

pub mod observer;
pub mod scheduler;

pub use observer::{DeferredObserver, ObserverId, ObserverRegistry};
pub use scheduler::{FifoScheduler, Scheduler, Task};

use core::fmt;
use std::sync::Arc;

use crate::deferred::{Deferred, Resolver};
use crate::value::Value;

struct RuntimeInner {
    scheduler: Arc<dyn Scheduler>,
    observers: ObserverRegistry,
}

/// Shared context for a family of deferred values.
///
/// Cloning is cheap; all clones share the scheduler and observers.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime over the given scheduler.
    pub fn new<S: Scheduler + 'static>(scheduler: Arc<S>) -> Self {
        Self::with_scheduler(scheduler)
    }

    /// Creates a runtime over an already type-erased scheduler.
    #[must_use]
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                scheduler,
                observers: ObserverRegistry::new(),
            }),
        }
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// Returns the observer registry.
    #[must_use]
    pub fn observers(&self) -> &ObserverRegistry {
        &self.inner.observers
    }

    /// Installs an observer.
    pub fn install_observer(&self, observer: Arc<dyn DeferredObserver>) -> ObserverId {
        self.inner.observers.install(observer)
    }

    /// Uninstalls an observer. Returns false if it was not installed.
    pub fn uninstall_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.uninstall(id)
    }

    /// Returns the number of installed observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Creates a deferred value driven by `executor`.
    pub fn deferred<F>(&self, executor: F) -> Deferred
    where
        F: FnOnce(Resolver) -> Result<(), Value>,
    {
        Deferred::new(self, executor)
    }

    /// Returns true if both handles refer to the same runtime.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn schedule(&self, task: Task) {
        self.inner.scheduler.schedule(task);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("observers", &self.inner.observers)
            .finish_non_exhaustive()
    }
}
