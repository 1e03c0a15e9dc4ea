//! Deferred: single-assignment deferred values with chainable continuations.
//!
//! # Overview
//!
//! A [`Deferred`] value starts pending and is settled exactly once: fulfilled
//! with a value, rejected with a reason, or made to adopt another deferred
//! value. Continuations attached with [`Deferred::then`] always run later,
//! through an injected [`Scheduler`], never inside the call that attached
//! them or settled the value.
//!
//! # Core Guarantees
//!
//! - **Single assignment**: the first resolve, reject, or executor failure wins
//! - **Asynchronous dispatch**: callbacks never run synchronously
//! - **Attachment order**: continuations on one value dispatch in the order attached
//! - **Failure capture**: errors and panics in user code become rejections
//! - **Interop**: foreign thenables are assimilated; own values are adopted directly
//!
//! # Module Structure
//!
//! - [`value`]: Host value model (errors, functions, objects)
//! - [`safe_call`]: Wrappers that turn failures and panics into `Err` values
//! - [`deferred`]: The deferred value state machine
//! - [`runtime`]: Scheduler capability and instrumentation observers
//! - [`time`]: Timer capability
//! - [`tracking`]: Unhandled-rejection tracker
//! - [`lab`]: Deterministic host with virtual time for testing
//! - [`error`]: Error types
//! - [`tracing_compat`]: Logging macros with an opt-out feature

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod deferred;
pub mod error;
pub mod lab;
pub mod runtime;
pub mod safe_call;
pub mod time;
pub mod tracing_compat;
pub mod tracking;
pub mod value;

#[cfg(test)]
pub(crate) mod test_utils;

pub use deferred::{
    Callback, Deferred, DeferredId, DeferredState, Resolver, Settlement, MAX_ASSIMILATION_DEPTH,
};
pub use error::{Error, ErrorKind, Result};
pub use lab::{LabConfig, LabHost, MemoryConsole};
pub use runtime::{DeferredObserver, FifoScheduler, ObserverId, Runtime, Scheduler, Task};
pub use time::{Timer, TimerHandle};
pub use tracking::{Console, RejectionTracker, StderrConsole, TrackingOptions};
pub use value::{ErrorClass, ErrorValue, Function, HostObject, Object, Record, Value};
