//! Error types for deferred values.
//!
//! Only malformed calls to the public constructor surface as [`Error`] to
//! the caller. Every failure inside user-supplied code (executors,
//! continuations, foreign `then` members) is captured and turned into a
//! rejection of the nearest downstream deferred value instead.
//!
//! # Error Kinds
//!
//! - **InvalidConstruction**: the dynamic constructor was called without a runtime
//! - **InvalidArgument**: the dynamic constructor was given a non-callable producer
//! - **CyclicResolution**: a deferred value was resolved with itself
//! - **CallbackFailure**: a continuation or probed accessor failed
//! - **InvalidConfiguration**: tracker options could not be parsed

use core::fmt;

use crate::value::{ErrorClass, ErrorValue, Value};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The constructor was invoked without an instantiation context.
    InvalidConstruction,
    /// The constructor's producer is not callable.
    InvalidArgument,
    /// A deferred value was resolved with itself (directly or through adoption).
    CyclicResolution,
    /// A user-supplied callback failed.
    CallbackFailure,
    /// Configuration could not be applied.
    InvalidConfiguration,
}

impl ErrorKind {
    /// Returns the error class used when this kind becomes a rejection reason.
    #[must_use]
    pub const fn error_class(&self) -> ErrorClass {
        match self {
            Self::InvalidConstruction | Self::InvalidArgument | Self::CyclicResolution => {
                ErrorClass::TypeError
            }
            Self::CallbackFailure | Self::InvalidConfiguration => ErrorClass::Error,
        }
    }
}

/// The main error type for deferred operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The constructor was called without a runtime.
    #[must_use]
    pub fn invalid_construction() -> Self {
        Self::new(ErrorKind::InvalidConstruction)
            .with_message("deferred values must be constructed with a runtime")
    }

    /// The constructor's producer is not a function.
    #[must_use]
    pub fn invalid_argument() -> Self {
        Self::new(ErrorKind::InvalidArgument)
            .with_message("deferred constructor's argument is not a function")
    }

    /// A deferred value was resolved with itself.
    #[must_use]
    pub fn cyclic_resolution() -> Self {
        Self::new(ErrorKind::CyclicResolution)
            .with_message("a deferred value cannot be resolved with itself")
    }

    /// Returns true if this error reports a self-resolution.
    #[must_use]
    pub const fn is_cyclic(&self) -> bool {
        matches!(self.kind, ErrorKind::CyclicResolution)
    }

    /// Converts this error into a rejection reason.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Error(self.to_error_value())
    }

    /// Converts this error into an error value of the matching class.
    #[must_use]
    pub fn to_error_value(&self) -> ErrorValue {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.kind));
        ErrorValue::new(self.kind.error_class(), message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<Error> for Value {
    fn from(err: Error) -> Self {
        err.to_value()
    }
}

/// A specialized Result type for deferred operations.
pub type Result<T> = core::result::Result<T, Error>;
