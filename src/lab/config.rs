//! Configuration for the lab host.
//!
//! The lab configuration controls deterministic execution:
//! - Maximum number of microtasks a single drain may run
//! - Whether exceeding that limit panics or only logs

/// Configuration for the lab host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Maximum number of microtasks a single `run_until_idle` call runs
    /// before giving up. `None` disables the guard.
    pub max_steps: Option<u64>,
    /// Whether to panic when the step limit is hit.
    pub panic_on_step_limit: bool,
}

impl LabConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_steps: Some(100_000),
            panic_on_step_limit: false,
        }
    }

    /// Sets the maximum number of steps.
    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Disables the step limit.
    #[must_use]
    pub const fn no_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Sets whether to panic when the step limit is hit.
    #[must_use]
    pub const fn panic_on_step_limit(mut self, value: bool) -> Self {
        self.panic_on_step_limit = value;
        self
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::new()
    }
}
