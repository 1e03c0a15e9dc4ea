//! Deterministic lab host for testing.
//!
//! The lab host provides:
//!
//! - A FIFO microtask queue implementing [`Scheduler`]
//! - Virtual time in milliseconds implementing [`Timer`]
//! - A recording [`MemoryConsole`] for report assertions
//!
//! Nothing runs until the test drives it: [`LabHost::run_until_idle`] drains
//! microtasks, and [`LabHost::advance_by`] / [`LabHost::advance_to`] move
//! virtual time forward, firing due timers in deadline order and draining
//! microtasks after each one.
//!
//! ```ignore
//! let host = Arc::new(LabHost::default());
//! let runtime = host.runtime();
//! let d = Deferred::resolved(&runtime, Value::from(1)).then_ok(Ok);
//! host.run_until_idle();
//! ```

pub mod config;
pub mod console;
pub mod virtual_time_wheel;

pub use config::LabConfig;
pub use console::MemoryConsole;
pub use virtual_time_wheel::{ExpiredTimer, VirtualTimerHandle, VirtualTimerWheel};

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::runtime::{Runtime, Scheduler, Task};
use crate::time::{Timer, TimerHandle};
use crate::tracing_compat::{trace, warn};

/// Scheduler and timer driven entirely by the test.
pub struct LabHost {
    config: LabConfig,
    microtasks: Mutex<VecDeque<Task>>,
    timers: Mutex<VirtualTimerWheel>,
}

impl LabHost {
    /// Creates a lab host at virtual time zero.
    #[must_use]
    pub fn new(config: LabConfig) -> Self {
        Self {
            config,
            microtasks: Mutex::new(VecDeque::new()),
            timers: Mutex::new(VirtualTimerWheel::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Creates a runtime that schedules onto this host.
    #[must_use]
    pub fn runtime(self: &Arc<Self>) -> Runtime {
        Runtime::new(Arc::clone(self))
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_millis())
    }

    /// Returns the current virtual time in milliseconds.
    #[must_use]
    pub fn now_millis(&self) -> u64 {
        self.timers.lock().current_tick()
    }

    /// Returns the number of queued microtasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.microtasks.lock().len()
    }

    /// Returns the number of armed, uncancelled timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }

    /// Runs microtasks until the queue is empty, including ones queued while
    /// draining. Returns the number of tasks run.
    ///
    /// Stops early once `max_steps` tasks have run in this call.
    pub fn run_until_idle(&self) -> usize {
        let mut steps = 0_usize;
        loop {
            if self.step_limit_reached(steps) {
                break;
            }
            let task = self.microtasks.lock().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            steps += 1;
        }
        steps
    }

    fn step_limit_reached(&self, steps: usize) -> bool {
        let Some(limit) = self.config.max_steps else {
            return false;
        };
        if (steps as u64) < limit {
            return false;
        }
        let pending = self.pending_tasks();
        if pending == 0 {
            return true;
        }
        warn!(limit, pending, "lab step limit reached with microtasks pending");
        assert!(
            !self.config.panic_on_step_limit,
            "lab step limit of {limit} reached with {pending} microtasks pending"
        );
        true
    }

    /// Moves virtual time forward by `delta`. Returns the number of timers
    /// fired.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now_millis().saturating_add(duration_millis(delta));
        self.advance_to(target)
    }

    /// Moves virtual time to `target_ms`, firing every timer due by then.
    ///
    /// Pending microtasks are drained first, and again after each timer, so
    /// timers armed by earlier timers or their continuations also fire if
    /// due. Returns the number of timers fired.
    pub fn advance_to(&self, target_ms: u64) -> usize {
        self.run_until_idle();
        let mut fired = 0;
        loop {
            let due = {
                let mut wheel = self.timers.lock();
                match wheel.next_deadline() {
                    Some(deadline) if deadline <= target_ms => wheel.advance_to(deadline),
                    _ => break,
                }
            };
            for timer in due {
                trace!(timer = timer.timer_id, deadline = timer.deadline, "timer fired");
                (timer.task)();
                fired += 1;
                self.run_until_idle();
            }
        }
        let skipped = self.timers.lock().advance_to(target_ms);
        debug_assert!(skipped.is_empty());
        fired
    }

    /// Advances to the next timer deadline and fires it. Returns false if no
    /// timer is armed.
    pub fn advance_to_next_timer(&self) -> bool {
        let next = self.timers.lock().next_deadline();
        next.is_some_and(|deadline| self.advance_to(deadline) > 0)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for LabHost {
    fn default() -> Self {
        Self::new(LabConfig::default())
    }
}

impl Scheduler for LabHost {
    fn schedule(&self, task: Task) {
        self.microtasks.lock().push_back(task);
    }
}

impl Timer for LabHost {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut wheel = self.timers.lock();
        let deadline = wheel.current_tick().saturating_add(duration_millis(delay));
        let handle = wheel.insert(deadline, task);
        TimerHandle::new(handle.timer_id())
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.lock().cancel(handle.id());
    }
}

impl fmt::Debug for LabHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabHost")
            .field("now_ms", &self.now_millis())
            .field("pending_tasks", &self.pending_tasks())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |label: &str| -> Task {
                let log = Arc::clone(&log);
                let label = label.to_string();
                Box::new(move || log.lock().push(label))
            }
        };
        (log, make)
    }

    #[test]
    fn microtasks_wait_for_drain() {
        let host = LabHost::default();
        let (log, task) = recorder();
        host.schedule(task("a"));
        host.schedule(task("b"));
        assert_eq!(host.pending_tasks(), 2);
        assert!(log.lock().is_empty());
        assert_eq!(host.run_until_idle(), 2);
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let host = LabHost::default();
        let (log, task) = recorder();
        host.set_timeout(Duration::from_millis(200), task("slow"));
        host.set_timeout(Duration::from_millis(100), task("fast"));
        assert_eq!(host.advance_by(Duration::from_millis(150)), 1);
        assert_eq!(host.now(), Duration::from_millis(150));
        assert_eq!(host.advance_to(200), 1);
        assert_eq!(*log.lock(), vec!["fast", "slow"]);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let host = LabHost::default();
        let (log, task) = recorder();
        let handle = host.set_timeout(Duration::from_millis(10), task("cleared"));
        host.clear_timeout(handle);
        host.clear_timeout(handle);
        assert_eq!(host.advance_by(Duration::from_secs(1)), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn timer_armed_by_timer_fires_when_due() {
        let host = Arc::new(LabHost::default());
        let (log, task) = recorder();
        let inner = task("inner");
        let rearm: Task = {
            let host = Arc::clone(&host);
            Box::new(move || {
                host.set_timeout(Duration::from_millis(10), inner);
            })
        };
        host.set_timeout(Duration::from_millis(10), rearm);
        assert_eq!(host.advance_to(25), 2);
        assert_eq!(*log.lock(), vec!["inner"]);
    }

    #[test]
    fn microtasks_drain_after_each_timer() {
        let host = Arc::new(LabHost::default());
        let (log, task) = recorder();
        let micro = task("micro");
        {
            let host2 = Arc::clone(&host);
            host.set_timeout(
                Duration::from_millis(5),
                Box::new(move || host2.schedule(micro)),
            );
        }
        host.set_timeout(Duration::from_millis(5), task("second-timer"));
        host.advance_by(Duration::from_millis(5));
        assert_eq!(*log.lock(), vec!["micro", "second-timer"]);
    }

    #[test]
    fn step_limit_stops_runaway_drain() {
        let host = Arc::new(LabHost::new(LabConfig::new().max_steps(3)));
        fn respawn(host: Arc<LabHost>) {
            let next = Arc::clone(&host);
            host.schedule(Box::new(move || respawn(next)));
        }
        respawn(Arc::clone(&host));
        assert_eq!(host.run_until_idle(), 3);
        assert_eq!(host.pending_tasks(), 1);
    }

    #[test]
    fn advance_to_next_timer() {
        let host = LabHost::default();
        let (_log, task) = recorder();
        assert!(!host.advance_to_next_timer());
        host.set_timeout(Duration::from_millis(42), task("t"));
        assert!(host.advance_to_next_timer());
        assert_eq!(host.now_millis(), 42);
    }
}
