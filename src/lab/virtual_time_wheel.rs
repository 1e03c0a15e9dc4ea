//! Virtual time wheel for the lab host.
//!
//! Timers are keyed by virtual milliseconds rather than wall-clock time:
//!
//! - Same tick → same timers expire
//! - Expiration order is deterministic (deadline, then insertion order)
//! - No wall-clock dependencies
//!
//! # Example
//!
//! ```ignore
//! use deferred::lab::VirtualTimerWheel;
//!
//! let mut wheel = VirtualTimerWheel::new();
//! wheel.insert(100, Box::new(|| println!("late")));
//! wheel.insert(50, Box::new(|| println!("early")));
//!
//! let expired = wheel.advance_to_next();   // now at tick 50
//! assert_eq!(expired.len(), 1);
//! ```

use core::fmt;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::runtime::Task;

struct VirtualTimer {
    deadline: u64,
    timer_id: u64,
    task: Task,
}

impl Eq for VirtualTimer {}

impl PartialEq for VirtualTimer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.timer_id == other.timer_id
    }
}

impl Ord for VirtualTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap ordering: earliest deadline first, then lowest timer_id
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.timer_id.cmp(&self.timer_id))
    }
}

impl PartialOrd for VirtualTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A timer handle for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualTimerHandle {
    timer_id: u64,
    deadline: u64,
}

impl VirtualTimerHandle {
    /// Returns the timer ID.
    #[must_use]
    pub const fn timer_id(&self) -> u64 {
        self.timer_id
    }

    /// Returns the deadline tick.
    #[must_use]
    pub const fn deadline(&self) -> u64 {
        self.deadline
    }
}

/// A timer whose deadline has been reached.
pub struct ExpiredTimer {
    /// Timer ID.
    pub timer_id: u64,
    /// Deadline tick the timer was set for.
    pub deadline: u64,
    /// The callback to run.
    pub task: Task,
}

impl fmt::Debug for ExpiredTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiredTimer")
            .field("timer_id", &self.timer_id)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Min-heap of timers over virtual milliseconds, with lazy cancellation.
pub struct VirtualTimerWheel {
    heap: BinaryHeap<VirtualTimer>,
    current_tick: u64,
    next_timer_id: u64,
    cancelled: HashSet<u64>,
}

impl Default for VirtualTimerWheel {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTimerWheel {
    /// Creates a new virtual timer wheel starting at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            current_tick: 0,
            next_timer_id: 0,
            cancelled: HashSet::new(),
        }
    }

    /// Returns the current virtual time in ticks.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Returns the number of pending, non-cancelled timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len() - self.cancelled.len()
    }

    /// Returns true if there are no pending timers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a timer to fire at the given deadline tick.
    pub fn insert(&mut self, deadline: u64, task: Task) -> VirtualTimerHandle {
        let timer_id = self.next_timer_id;
        self.next_timer_id += 1;
        self.heap.push(VirtualTimer {
            deadline,
            timer_id,
            task,
        });
        VirtualTimerHandle { timer_id, deadline }
    }

    /// Cancels a pending timer. Returns false if it already fired, was
    /// already cancelled, or never existed.
    ///
    /// The entry stays in the heap and is skipped when its deadline is
    /// reached.
    pub fn cancel(&mut self, timer_id: u64) -> bool {
        let pending = self.heap.iter().any(|t| t.timer_id == timer_id);
        pending && self.cancelled.insert(timer_id)
    }

    /// Returns the deadline of the next non-cancelled timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|t| !self.cancelled.contains(&t.timer_id))
            .map(|t| t.deadline)
            .min()
    }

    /// Advances virtual time to the next timer deadline.
    ///
    /// Returns an empty list and leaves time unchanged when no timer is
    /// pending.
    pub fn advance_to_next(&mut self) -> Vec<ExpiredTimer> {
        self.next_deadline()
            .map_or_else(Vec::new, |deadline| self.advance_to(deadline))
    }

    /// Advances virtual time by the given number of ticks.
    pub fn advance_by(&mut self, ticks: u64) -> Vec<ExpiredTimer> {
        self.advance_to(self.current_tick.saturating_add(ticks))
    }

    /// Advances to the given absolute tick and returns every timer due by
    /// then, ordered by deadline and then by timer id.
    ///
    /// A target in the past expires nothing and leaves time unchanged. A
    /// target equal to the current tick expires timers set for "now".
    pub fn advance_to(&mut self, target_tick: u64) -> Vec<ExpiredTimer> {
        if target_tick < self.current_tick {
            return Vec::new();
        }

        let mut expired = Vec::new();
        while self
            .heap
            .peek()
            .is_some_and(|timer| timer.deadline <= target_tick)
        {
            let Some(timer) = self.heap.pop() else {
                break;
            };
            if self.cancelled.remove(&timer.timer_id) {
                continue;
            }
            expired.push(ExpiredTimer {
                timer_id: timer.timer_id,
                deadline: timer.deadline,
                task: timer.task,
            });
        }

        self.current_tick = target_tick;
        expired
    }

    /// Drops all timers without running them.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.cancelled.clear();
    }
}

impl fmt::Debug for VirtualTimerWheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTimerWheel")
            .field("current_tick", &self.current_tick)
            .field("pending", &self.len())
            .finish()
    }
}
