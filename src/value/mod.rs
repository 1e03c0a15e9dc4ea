//! Dynamic values flowing through deferred values.
//!
//! A deferred value may be settled with anything a host hands it: plain
//! data, errors, callables, foreign objects (possibly thenable), or another
//! deferred value. [`Value`] is that universe. Clones are cheap; compound
//! variants share their payload by reference.

mod error_value;
mod function;
mod object;

pub use error_value::{ErrorClass, ErrorValue, UnknownErrorClass};
pub use function::Function;
pub use object::{HostObject, Object, Record};

use core::fmt;
use std::sync::Arc;

use crate::deferred::Deferred;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// Immutable string.
    String(Arc<str>),
    /// Error value.
    Error(ErrorValue),
    /// Callable.
    Function(Function),
    /// Host object, probed for a `then` member during resolution.
    Object(Object),
    /// A deferred value of this crate.
    Deferred(Deferred),
}

impl Value {
    /// Returns true for `Undefined`.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns true for values that resolution treats as objects
    /// (functions, host objects and deferred values).
    #[must_use]
    pub const fn is_object_like(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Object(_) | Self::Deferred(_))
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the error, if this is one.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the function, if this is one.
    #[must_use]
    pub const fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the deferred value, if this is one.
    #[must_use]
    pub const fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Self::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Text used in diagnostic output.
    #[must_use]
    pub fn diagnostic_text(&self) -> String {
        match self {
            Self::Error(e) => e.diagnostic_text(),
            other => other.to_string(),
        }
    }
}

/// Numbers compare by SameValue: every NaN equals every NaN, and `0.0`
/// differs from `-0.0`. Functions, objects and deferred values compare by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Deferred(a), Self::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Error(e) => fmt::Debug::fmt(e, f),
            Self::Function(func) => fmt::Debug::fmt(func, f),
            Self::Object(obj) => fmt::Debug::fmt(obj, f),
            Self::Deferred(d) => write!(f, "Deferred({})", d.id()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Error(e) => fmt::Display::fmt(e, f),
            Self::Function(_) => f.write_str("[function]"),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Deferred(d) => write!(f, "[deferred {}]", d.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Self::Error(e)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Self::Deferred(d)
    }
}
