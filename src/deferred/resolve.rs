//! The resolution procedure.
//!
//! Resolving a deferred value with `x`:
//!
//! 1. `x` is the value itself, or a deferred value whose adoption chain
//!    leads back to it: reject with a cyclic-resolution type error.
//! 2. `x` is another deferred value: adopt it. No `then` lookup happens.
//! 3. `x` is an object: read its `then` member exactly once. A throwing
//!    read rejects. A callable `then` is invoked with the object as
//!    receiver and a fresh resolve/reject pair guarded by one latch.
//! 4. Anything else fulfills.
//!
//! Every settling path is guarded by a [`Resolver`] latch so that only the
//! first call to resolve, reject, or a thrown error has any effect.
//!
//! Thenables that resolve synchronously nest assimilation on the current
//! thread. Nesting deeper than [`MAX_ASSIMILATION_DEPTH`] rejects with a
//! `RangeError` instead of growing the stack further.

use core::fmt;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Deferred, State};
use crate::error::Error;
use crate::safe_call;
use crate::tracing_compat::{debug, trace};
use crate::value::{ErrorValue, Function, Value};

/// Maximum number of thenable assimilations nested on one thread.
pub const MAX_ASSIMILATION_DEPTH: u32 = 64;

thread_local! {
    static ASSIMILATION_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Restores the previous assimilation depth on drop.
struct DepthGuard {
    prev: u32,
}

impl DepthGuard {
    /// Enters one level of assimilation, or returns `None` at the limit.
    fn enter() -> Option<Self> {
        let prev = ASSIMILATION_DEPTH.with(Cell::get);
        if prev >= MAX_ASSIMILATION_DEPTH {
            return None;
        }
        ASSIMILATION_DEPTH.with(|depth| depth.set(prev + 1));
        Some(Self { prev })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        ASSIMILATION_DEPTH.with(|depth| depth.set(self.prev));
    }
}

/// The one-shot resolve/reject capability for a deferred value.
///
/// Clones share a single latch: after the first `resolve` or `reject`
/// through any clone, all further calls are ignored.
#[derive(Clone)]
pub struct Resolver {
    target: Deferred,
    done: Arc<AtomicBool>,
}

impl Resolver {
    pub(crate) fn new(target: Deferred) -> Self {
        Self {
            target,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    fn claim(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }

    /// Resolves the target with `value`. Ignored after the first call.
    pub fn resolve(&self, value: Value) {
        if self.claim() {
            self.target.resolve_with(value);
        } else {
            trace!(deferred = %self.target.id(), "resolve ignored, already done");
        }
    }

    /// Rejects the target with `reason`. Ignored after the first call.
    pub fn reject(&self, reason: Value) {
        if self.claim() {
            self.target.reject_with(reason);
        } else {
            trace!(deferred = %self.target.id(), "reject ignored, already done");
        }
    }

    /// Returns true once resolve or reject has been called.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Returns the deferred value this resolver settles.
    #[must_use]
    pub fn deferred(&self) -> &Deferred {
        &self.target
    }

    /// Splits into host-callable resolve and reject functions sharing this
    /// resolver's latch.
    #[must_use]
    pub fn into_functions(self) -> (Function, Function) {
        let for_reject = self.clone();
        let resolve = Function::from_unary(move |value| {
            self.resolve(value);
            Ok(Value::Undefined)
        });
        let reject = Function::from_unary(move |reason| {
            for_reject.reject(reason);
            Ok(Value::Undefined)
        });
        (resolve, reject)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("target", &self.target.id())
            .field("done", &self.is_done())
            .finish()
    }
}

fn drive<F>(target: &Deferred, run: F)
where
    F: FnOnce(&Resolver) -> Result<(), Value>,
{
    let resolver = Resolver::new(target.clone());
    if let Err(reason) = run(&resolver) {
        if resolver.claim() {
            target.reject_with(reason);
        } else {
            trace!(deferred = %target.id(), "late throw ignored, already done");
        }
    }
}

/// Runs a Rust executor against `target` with a fresh latch.
pub(crate) fn do_resolve<F>(executor: F, target: &Deferred)
where
    F: FnOnce(Resolver) -> Result<(), Value>,
{
    drive(target, |resolver| safe_call::call1(executor, resolver.clone()));
}

/// Calls a host function as `receiver.f(resolve, reject)` with a fresh
/// latch over `target`.
pub(crate) fn do_resolve_function(f: &Function, receiver: &Value, target: &Deferred) {
    drive(target, |resolver| {
        let (resolve, reject) = resolver.clone().into_functions();
        safe_call::call2(
            |resolve, reject| f.call(receiver, &[resolve, reject]).map(drop),
            Value::from(resolve),
            Value::from(reject),
        )
    });
}

impl Deferred {
    /// Applies the resolution procedure. No-op unless pending.
    pub(crate) fn resolve_with(&self, value: Value) {
        if !self.is_pending() {
            trace!(deferred = %self.id(), "resolve on settled value ignored");
            return;
        }
        match value {
            Value::Deferred(other) => {
                if other.adoption_reaches(self) {
                    debug!(deferred = %self.id(), "cyclic resolution rejected");
                    self.reject_with(Error::cyclic_resolution().to_value());
                } else {
                    debug!(deferred = %self.id(), adopted = %other.id(), "adopting");
                    self.settle(State::Adopted(other));
                }
            }
            Value::Object(object) => match safe_call::probe_then(&object) {
                Err(reason) => self.reject_with(reason),
                Ok(Value::Function(then)) => match DepthGuard::enter() {
                    Some(_depth) => {
                        trace!(deferred = %self.id(), "assimilating thenable");
                        do_resolve_function(&then, &Value::Object(object), self);
                    }
                    None => {
                        debug!(
                            deferred = %self.id(),
                            limit = MAX_ASSIMILATION_DEPTH,
                            "thenable assimilation too deep"
                        );
                        let err = ErrorValue::range_error(
                            "maximum thenable assimilation depth exceeded",
                        );
                        self.reject_with(Value::Error(err));
                    }
                },
                Ok(_) => {
                    self.settle(State::Fulfilled(Value::Object(object)));
                }
            },
            other => {
                self.settle(State::Fulfilled(other));
            }
        }
    }

    /// Rejects with `reason`. No-op unless pending.
    pub(crate) fn reject_with(&self, reason: Value) {
        self.settle(State::Rejected(reason));
    }

    /// Leaves `Pending` for `next`, fires the reject hook if rejecting, and
    /// flushes waiters. Returns false if the value had already left
    /// `Pending`.
    fn settle(&self, next: State) -> bool {
        let rejection = match &next {
            State::Rejected(reason) => Some(reason.clone()),
            _ => None,
        };
        {
            let mut slot = self.inner.slot.lock();
            if !matches!(slot.state, State::Pending) {
                return false;
            }
            trace!(deferred = %self.id(), state = %next.tag(), "settled");
            slot.state = next;
        }
        if let Some(reason) = rejection {
            self.runtime().observers().notify_reject(self, &reason);
        }
        self.finalize();
        true
    }
}
