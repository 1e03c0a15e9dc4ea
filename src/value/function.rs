//! Callable values.

use core::fmt;
use std::sync::Arc;

use super::Value;

type FunctionImpl = dyn Fn(&Value, &[Value]) -> Result<Value, Value> + Send + Sync;

/// A shared callable value.
///
/// A function receives its receiver (`this`) and positional arguments and
/// either returns a value or throws one (`Err`). Missing arguments are the
/// callee's concern; [`Function::from_unary`] treats them as `Undefined`.
#[derive(Clone)]
pub struct Function {
    inner: Arc<FunctionImpl>,
}

impl Function {
    /// Wraps a closure taking a receiver and an argument list.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Value> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Wraps a single-argument closure that ignores its receiver.
    pub fn from_unary<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Value> + Send + Sync + 'static,
    {
        Self::new(move |_this, args| f(args.first().cloned().unwrap_or_default()))
    }

    /// Invokes the function. Panics inside the closure are not caught here;
    /// callers go through [`crate::safe_call`].
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, Value> {
        (self.inner)(this, args)
    }

    /// Returns true if both handles refer to the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}
