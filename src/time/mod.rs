//! Timer capability.
//!
//! The rejection tracker needs one-shot, cancellable timeouts. Like the
//! [`Scheduler`](crate::runtime::Scheduler), the timer is a host
//! collaborator: the crate only defines the interface. The lab host
//! provides a virtual-time implementation for tests.

use core::fmt;
use std::time::Duration;

use crate::runtime::Task;

/// Opaque handle for a pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a handle from a timer-specific id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the timer-specific id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Host capability for one-shot timeouts.
pub trait Timer: Send + Sync {
    /// Runs `task` once, no earlier than `delay` from now.
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Cancels a pending timeout. Clearing a fired or unknown handle is a
    /// no-op.
    fn clear_timeout(&self, handle: TimerHandle);
}
