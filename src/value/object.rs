//! Host objects and foreign thenables.
//!
//! The resolution procedure only ever asks one thing of an object: the value
//! of its `then` member. [`HostObject`] captures exactly that capability, so
//! foreign deferred-value implementations interoperate by exposing a callable
//! `then`, and accessors that fail are modelled by returning `Err`.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Function, Value};

/// An object that can be probed for a `then` member.
pub trait HostObject: Send + Sync + fmt::Debug {
    /// Reads the `then` member.
    ///
    /// Returns `Ok(Value::Undefined)` when the member is absent and `Err`
    /// when reading it throws.
    fn get_then(&self) -> Result<Value, Value>;
}

/// A shared handle to a host object.
#[derive(Clone)]
pub struct Object {
    inner: Arc<dyn HostObject>,
}

impl Object {
    /// Wraps a host object.
    pub fn new(object: impl HostObject + 'static) -> Self {
        Self {
            inner: Arc::new(object),
        }
    }

    /// Wraps an already shared host object.
    #[must_use]
    pub fn from_arc(inner: Arc<dyn HostObject>) -> Self {
        Self { inner }
    }

    /// Creates a thenable whose `then` member is `then`.
    #[must_use]
    pub fn thenable(then: Function) -> Self {
        Self::new(Record::new().with("then", Value::Function(then)))
    }

    /// Returns the underlying host object.
    #[must_use]
    pub fn host(&self) -> &dyn HostObject {
        self.inner.as_ref()
    }

    pub(crate) fn get_then(&self) -> Result<Value, Value> {
        self.inner.get_then()
    }

    /// Returns true if both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.inner).finish()
    }
}

/// A plain object with named fields.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Returns a field's value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl HostObject for Record {
    fn get_then(&self) -> Result<Value, Value> {
        Ok(self.get("then").cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ErrorValue;

    #[derive(Debug)]
    struct ThrowingAccessor;

    impl HostObject for ThrowingAccessor {
        fn get_then(&self) -> Result<Value, Value> {
            Err(ErrorValue::type_error("then getter failed").into())
        }
    }

    #[test]
    fn record_without_then_is_plain() {
        let obj = Object::new(Record::new().with("x", Value::from(1)));
        assert_eq!(obj.get_then(), Ok(Value::Undefined));
    }

    #[test]
    fn thenable_exposes_function() {
        let then = Function::new(|_, _| Ok(Value::Undefined));
        let obj = Object::thenable(then.clone());
        assert_eq!(obj.get_then(), Ok(Value::Function(then)));
    }

    #[test]
    fn throwing_accessor_surfaces_err() {
        let obj = Object::new(ThrowingAccessor);
        assert!(obj.get_then().is_err());
    }
}
