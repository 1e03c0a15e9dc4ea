//! Error values carried as rejection reasons.

use core::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Category of an error value.
///
/// Categories form a shallow hierarchy: every class is an [`ErrorClass::Error`],
/// and each specific class only matches itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorClass {
    /// Generic error.
    Error,
    /// A value had the wrong type.
    TypeError,
    /// A value was outside its allowed range.
    RangeError,
    /// A reference could not be resolved.
    ReferenceError,
    /// Malformed source text or input.
    SyntaxError,
    /// Failure while evaluating dynamic code.
    EvalError,
    /// Malformed URI handling.
    UriError,
    /// A Rust panic captured by a safe-call wrapper.
    Panic,
}

impl ErrorClass {
    /// Every class, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Error,
        Self::TypeError,
        Self::RangeError,
        Self::ReferenceError,
        Self::SyntaxError,
        Self::EvalError,
        Self::UriError,
        Self::Panic,
    ];

    /// Returns the conventional name of the class.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
            Self::EvalError => "EvalError",
            Self::UriError => "URIError",
            Self::Panic => "Panic",
        }
    }

    /// Returns true if an error of this class is an instance of `ancestor`.
    #[must_use]
    pub fn is_a(self, ancestor: Self) -> bool {
        ancestor == Self::Error || self == ancestor
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error class {0:?}")]
pub struct UnknownErrorClass(pub String);

impl FromStr for ErrorClass {
    type Err = UnknownErrorClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownErrorClass(wanted.to_string()))
    }
}

#[derive(Debug)]
struct ErrorInner {
    class: ErrorClass,
    message: String,
    stack: Option<String>,
}

/// An error used as a rejection reason.
///
/// Clones share identity: two clones compare equal, two separately
/// constructed errors with the same text do not.
#[derive(Clone)]
pub struct ErrorValue {
    inner: Arc<ErrorInner>,
}

impl ErrorValue {
    /// Creates an error of the given class.
    #[must_use]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ErrorInner {
                class,
                message: message.into(),
                stack: None,
            }),
        }
    }

    /// Creates a generic error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Error, message)
    }

    /// Creates a type error.
    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::TypeError, message)
    }

    /// Creates a range error.
    #[must_use]
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::RangeError, message)
    }

    /// Creates a reference error.
    #[must_use]
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ReferenceError, message)
    }

    /// Creates an error describing a captured panic.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Panic, message)
    }

    /// Attaches stack text, replacing any previous stack.
    #[must_use]
    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ErrorInner {
                class: self.inner.class,
                message: self.inner.message.clone(),
                stack: Some(stack.into()),
            }),
        }
    }

    /// Returns the error class.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.inner.class
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Returns the stack text, if any.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.inner.stack.as_deref()
    }

    /// Returns true if this error is an instance of any class in `list`.
    #[must_use]
    pub fn matches_any(&self, list: &[ErrorClass]) -> bool {
        list.iter().any(|class| self.class().is_a(*class))
    }

    /// Text used for diagnostics: the stack if present, else `Class: message`.
    #[must_use]
    pub fn diagnostic_text(&self) -> String {
        match self.stack() {
            Some(stack) => stack.to_string(),
            None => self.to_string(),
        }
    }

    /// Returns true if both handles refer to the same error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorValue")
            .field("class", &self.inner.class)
            .field("message", &self.inner.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.message.is_empty() {
            f.write_str(self.inner.class.name())
        } else {
            write!(f, "{}: {}", self.inner.class.name(), self.inner.message)
        }
    }
}
