//! Continuation callbacks.
//!
//! A [`Handler`] pairs up to two callbacks with the downstream deferred
//! value that receives whatever the chosen callback produces. Handlers are
//! consumed by invocation: each one runs at most once.

use core::fmt;

use super::{Deferred, Settlement};
use crate::safe_call;
use crate::tracing_compat::trace;
use crate::value::{Function, Value};

type NativeFn = Box<dyn FnOnce(Value) -> Result<Value, Value> + Send + 'static>;

enum CallbackKind {
    Native(NativeFn),
    Function(Function),
}

/// A fulfillment or rejection continuation.
///
/// Either a Rust closure or a host [`Function`]. Host functions are called
/// with an undefined receiver and the settled value as the only argument.
pub struct Callback {
    kind: CallbackKind,
}

impl Callback {
    /// Wraps a Rust closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        Self {
            kind: CallbackKind::Native(Box::new(f)),
        }
    }

    /// Wraps a host value if it is callable; any other value means "absent".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_function().map(|f| Self::from(f.clone()))
    }

    pub(crate) fn invoke(self, arg: Value) -> Result<Value, Value> {
        match self.kind {
            CallbackKind::Native(f) => f(arg),
            CallbackKind::Function(f) => f.call(&Value::Undefined, &[arg]),
        }
    }
}

impl From<Function> for Callback {
    fn from(f: Function) -> Self {
        Self {
            kind: CallbackKind::Function(f),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CallbackKind::Native(_) => f.write_str("Callback::Native"),
            CallbackKind::Function(func) => write!(f, "Callback::Function({func:?})"),
        }
    }
}

/// A pending continuation: callbacks plus the value that receives their
/// result.
pub(crate) struct Handler {
    on_fulfilled: Option<Callback>,
    on_rejected: Option<Callback>,
    downstream: Deferred,
}

impl Handler {
    pub(crate) fn new(
        on_fulfilled: Option<Callback>,
        on_rejected: Option<Callback>,
        downstream: Deferred,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            downstream,
        }
    }

    /// Runs the callback matching `settlement` and settles the downstream.
    ///
    /// With no matching callback the outcome passes through unchanged.
    pub(crate) fn run(self, settlement: Settlement) {
        let Self {
            on_fulfilled,
            on_rejected,
            downstream,
        } = self;
        let (callback, payload, fulfilled) = match settlement {
            Settlement::Fulfilled(value) => (on_fulfilled, value, true),
            Settlement::Rejected(reason) => (on_rejected, reason, false),
        };
        match callback {
            None if fulfilled => downstream.resolve_with(payload),
            None => downstream.reject_with(payload),
            Some(callback) => {
                trace!(downstream = %downstream.id(), fulfilled, "invoking continuation");
                match safe_call::call1(|arg| callback.invoke(arg), payload) {
                    Ok(result) => downstream.resolve_with(result),
                    Err(reason) => downstream.reject_with(reason),
                }
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .field("downstream", &self.downstream.id())
            .finish()
    }
}
