//! Scheduler capability.
//!
//! Continuation dispatch never runs in the turn that triggered it; it is
//! handed to a [`Scheduler`] supplied by the host. The contract is small:
//!
//! - tasks run one at a time, in the order they were scheduled (FIFO)
//! - a task runs exactly once
//! - a task never runs inside the `schedule` call that submitted it

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Host capability for running tasks "soon".
pub trait Scheduler: Send + Sync {
    /// Queues `task` to run after the current turn.
    fn schedule(&self, task: Task);
}

/// A plain FIFO queue that runs tasks only when drained explicitly.
///
/// Useful for hosts that pump their own loop; the lab host builds on the
/// same shape with virtual time added.
#[derive(Default)]
pub struct FifoScheduler {
    queue: Mutex<VecDeque<Task>>,
}

impl FifoScheduler {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if no tasks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Runs the oldest queued task, if any. Returns true if a task ran.
    pub fn run_one(&self) -> bool {
        let task = self.queue.lock().pop_front();
        task.map_or(false, |task| {
            task();
            true
        })
    }

    /// Runs tasks until the queue is empty, including tasks scheduled while
    /// draining. Returns the number of tasks run.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for FifoScheduler {
    fn schedule(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}

impl std::fmt::Debug for FifoScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoScheduler")
            .field("queued", &self.len())
            .finish()
    }
}
