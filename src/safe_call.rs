//! Safe-call wrappers.
//!
//! Every place the dispatch path runs foreign code (executors, continuation
//! callbacks, `then` accessors) goes through one of these wrappers. They
//! return a plain `Result`: `Ok` with the normal result, or `Err` with the
//! thrown value. A Rust panic inside the callee is caught and reported the
//! same way, as an [`ErrorClass::Panic`](crate::value::ErrorClass::Panic)
//! error, so callers only ever branch and never unwind.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::value::{ErrorValue, Object, Value};

/// Invokes a zero-argument callable.
pub fn call0<T, F>(f: F) -> Result<T, Value>
where
    F: FnOnce() -> Result<T, Value>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(panic_reason(payload.as_ref())),
    }
}

/// Invokes a single-argument callable.
pub fn call1<A, T, F>(f: F, a: A) -> Result<T, Value>
where
    F: FnOnce(A) -> Result<T, Value>,
{
    call0(move || f(a))
}

/// Invokes a two-argument callable.
pub fn call2<A, B, T, F>(f: F, a: A, b: B) -> Result<T, Value>
where
    F: FnOnce(A, B) -> Result<T, Value>,
{
    call0(move || f(a, b))
}

/// Reads an object's `then` member.
pub fn probe_then(object: &Object) -> Result<Value, Value> {
    call0(|| object.get_then())
}

/// Converts a panic payload into a rejection reason.
pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> Value {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string());
    Value::Error(ErrorValue::panic(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ErrorClass, HostObject, Record};

    #[derive(Debug)]
    struct PanickingAccessor;

    impl HostObject for PanickingAccessor {
        fn get_then(&self) -> Result<Value, Value> {
            panic!("accessor exploded");
        }
    }

    #[test]
    fn normal_results_pass_through() {
        assert_eq!(call0(|| Ok::<_, Value>(1)), Ok(1));
        assert_eq!(call1(|a: i32| Ok(a + 1), 1), Ok(2));
        assert_eq!(call2(|a: i32, b: i32| Ok(a * b), 3, 4), Ok(12));
    }

    #[test]
    fn thrown_values_are_captured() {
        let reason = Value::from("nope");
        let expected = reason.clone();
        assert_eq!(call1(|r: Value| Err::<(), _>(r), reason), Err(expected));
    }

    #[test]
    fn panics_become_panic_errors() {
        let result = call0(|| -> Result<(), Value> { panic!("callback exploded") });
        let reason = result.expect_err("panic should be captured");
        let err = reason.as_error().expect("reason should be an error");
        assert_eq!(err.class(), ErrorClass::Panic);
        assert_eq!(err.message(), "callback exploded");
    }

    #[test]
    fn formatted_panic_messages_are_kept() {
        let n = 3;
        let reason = call0(|| -> Result<(), Value> { panic!("failed after {n} tries") })
            .expect_err("panic should be captured");
        assert_eq!(
            reason.as_error().map(ErrorValue::message),
            Some("failed after 3 tries")
        );
    }

    #[test]
    fn probe_then_reads_member_and_catches_panics() {
        let plain = Object::new(Record::new());
        assert_eq!(probe_then(&plain), Ok(Value::Undefined));

        let exploding = Object::new(PanickingAccessor);
        let reason = probe_then(&exploding).expect_err("panic should be captured");
        assert_eq!(
            reason.as_error().map(ErrorValue::class),
            Some(ErrorClass::Panic)
        );
    }
}
