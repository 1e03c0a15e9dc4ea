//! Tracing compatibility layer for structured logging.
//!
//! With the `tracing-integration` feature (enabled by default) this module
//! re-exports the `tracing` macros. Without it, the same names expand to
//! nothing, so settlement and dispatch paths carry no logging cost.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deferred::tracing_compat::{debug, trace};
//!
//! trace!(deferred = %id, "fulfilled");
//! debug!(observer = %observer_id, "observer installed");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    //! No-op logging macros used when tracing is disabled.

    /// No-op trace-level logging macro.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op debug-level logging macro.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op info-level logging macro.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// No-op warn-level logging macro.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    /// No-op error-level logging macro.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    pub use crate::{debug, error, info, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;
