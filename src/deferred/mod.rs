//! Deferred values: single-assignment containers for an eventual result.
//!
//! # State Machine
//!
//! ```text
//!                 ┌──────────── resolve(plain) ───────────► Fulfilled(value)
//!                 │
//!   Pending ──────┼──────────── reject(reason) ───────────► Rejected(reason)
//!                 │
//!                 └──── resolve(other deferred) ──────────► Adopted(other)
//! ```
//!
//! A deferred value leaves `Pending` exactly once and is immutable
//! afterwards. An `Adopted` value has no outcome of its own: everything
//! attached to it is forwarded to the end of its adoption chain.
//!
//! # Submodules
//!
//! - [`handler`]: continuation callbacks and the handler record
//! - `resolve`: the resolution procedure and the one-shot [`Resolver`]
//! - `dispatch`: attaching continuations and scheduling their invocation

pub mod handler;

mod dispatch;
mod resolve;

pub use handler::Callback;
pub use resolve::{Resolver, MAX_ASSIMILATION_DEPTH};

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::value::Value;
use handler::Handler;

static NEXT_DEFERRED_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a deferred value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeferredId(u64);

impl DeferredId {
    fn next() -> Self {
        Self(NEXT_DEFERRED_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredId({})", self.0)
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// The observable state tag of a deferred value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredState {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
    /// Mirroring another deferred value.
    Adopted,
}

impl fmt::Display for DeferredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
            Self::Adopted => "adopted",
        };
        f.write_str(name)
    }
}

/// A terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Fulfilled with a value.
    Fulfilled(Value),
    /// Rejected with a reason.
    Rejected(Value),
}

impl Settlement {
    /// Returns true if fulfilled.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Returns true if rejected.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the value or reason.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Fulfilled(v) | Self::Rejected(v) => v,
        }
    }

    /// Converts into `Ok(value)` or `Err(reason)`.
    pub fn into_result(self) -> core::result::Result<Value, Value> {
        match self {
            Self::Fulfilled(v) => Ok(v),
            Self::Rejected(r) => Err(r),
        }
    }
}

pub(crate) enum State {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
    Adopted(Deferred),
}

impl State {
    const fn tag(&self) -> DeferredState {
        match self {
            Self::Pending => DeferredState::Pending,
            Self::Fulfilled(_) => DeferredState::Fulfilled,
            Self::Rejected(_) => DeferredState::Rejected,
            Self::Adopted(_) => DeferredState::Adopted,
        }
    }
}

/// State plus waiters, guarded together.
///
/// Zero or one waiter is stored inline; a second one spills to the heap.
pub(crate) struct Slot {
    pub(crate) state: State,
    pub(crate) waiters: SmallVec<[Handler; 1]>,
}

struct DeferredInner {
    id: DeferredId,
    runtime: Runtime,
    slot: Mutex<Slot>,
}

/// A single-assignment container for the eventual result of an operation.
///
/// Cloning produces another handle to the same deferred value.
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<DeferredInner>,
}

impl Deferred {
    pub(crate) fn pending(runtime: &Runtime) -> Self {
        Self {
            inner: Arc::new(DeferredInner {
                id: DeferredId::next(),
                runtime: runtime.clone(),
                slot: Mutex::new(Slot {
                    state: State::Pending,
                    waiters: SmallVec::new(),
                }),
            }),
        }
    }

    /// Creates a deferred value and runs `executor` synchronously with its
    /// [`Resolver`].
    ///
    /// If the executor returns `Err` or panics before settling, the deferred
    /// value is rejected with that reason.
    pub fn new<F>(runtime: &Runtime, executor: F) -> Self
    where
        F: FnOnce(Resolver) -> core::result::Result<(), Value>,
    {
        let deferred = Self::pending(runtime);
        resolve::do_resolve(executor, &deferred);
        deferred
    }

    /// Dynamic constructor for host bindings.
    ///
    /// `producer` must be a function; it is called with the resolve and
    /// reject functions as its two arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConstruction`](crate::error::ErrorKind)
    /// when no runtime is supplied and
    /// [`ErrorKind::InvalidArgument`](crate::error::ErrorKind) when the
    /// producer is not callable.
    pub fn construct(runtime: Option<&Runtime>, producer: &Value) -> Result<Self> {
        let runtime = runtime.ok_or_else(Error::invalid_construction)?;
        let producer = producer
            .as_function()
            .ok_or_else(Error::invalid_argument)?
            .clone();
        let deferred = Self::pending(runtime);
        resolve::do_resolve_function(&producer, &Value::Undefined, &deferred);
        Ok(deferred)
    }

    /// Creates a pending deferred value together with its resolver.
    #[must_use]
    pub fn with_resolver(runtime: &Runtime) -> (Self, Resolver) {
        let deferred = Self::pending(runtime);
        let resolver = Resolver::new(deferred.clone());
        (deferred, resolver)
    }

    /// Creates a deferred value resolved with `value`.
    ///
    /// A thenable `value` is adopted rather than stored.
    #[must_use]
    pub fn resolved(runtime: &Runtime, value: Value) -> Self {
        let deferred = Self::pending(runtime);
        deferred.resolve_with(value);
        deferred
    }

    /// Creates a deferred value rejected with `reason`.
    #[must_use]
    pub fn rejected(runtime: &Runtime, reason: Value) -> Self {
        let deferred = Self::pending(runtime);
        deferred.reject_with(reason);
        deferred
    }

    /// Returns the unique id.
    #[must_use]
    pub fn id(&self) -> DeferredId {
        self.inner.id
    }

    /// Returns the runtime this value dispatches through.
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Returns this value's own state tag (adoption is not followed).
    #[must_use]
    pub fn state(&self) -> DeferredState {
        self.inner.slot.lock().state.tag()
    }

    /// Returns true while this value has not left `Pending`.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.slot.lock().state, State::Pending)
    }

    /// Returns the outcome at the end of the adoption chain, if settled.
    #[must_use]
    pub fn settlement(&self) -> Option<Settlement> {
        let terminal = self.terminal();
        let slot = terminal.inner.slot.lock();
        match &slot.state {
            State::Fulfilled(v) => Some(Settlement::Fulfilled(v.clone())),
            State::Rejected(r) => Some(Settlement::Rejected(r.clone())),
            State::Pending | State::Adopted(_) => None,
        }
    }

    /// Returns true if at least one continuation is waiting on this value.
    #[must_use]
    pub fn has_waiters(&self) -> bool {
        !self.inner.slot.lock().waiters.is_empty()
    }

    /// Returns the number of continuations waiting on this value.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.inner.slot.lock().waiters.len()
    }

    /// Returns true if both handles refer to the same deferred value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn adopted_target(&self) -> Option<Self> {
        match &self.inner.slot.lock().state {
            State::Adopted(target) => Some(target.clone()),
            _ => None,
        }
    }

    /// Follows adoption links to the first value that is not `Adopted`.
    pub(crate) fn terminal(&self) -> Self {
        let mut current = self.clone();
        while let Some(next) = current.adopted_target() {
            current = next;
        }
        current
    }

    /// Returns true if `target` is reachable from `self` through adoption
    /// links, including `self` itself.
    pub(crate) fn adoption_reaches(&self, target: &Self) -> bool {
        let mut current = self.clone();
        loop {
            if current.ptr_eq(target) {
                return true;
            }
            match current.adopted_target() {
                Some(next) => current = next,
                None => return false,
            }
        }
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
