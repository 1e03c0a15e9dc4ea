//! Attaching continuations and scheduling them.
//!
//! Attachment always goes to the terminal value of an adoption chain. If
//! that value is still pending the handler is queued; otherwise it is
//! dispatched. Dispatch never invokes a callback synchronously: the work
//! is handed to the runtime's scheduler.

use std::sync::Arc;

use parking_lot::Mutex;

use super::handler::{Callback, Handler};
use super::{Deferred, Settlement, State};
use crate::tracing_compat::trace;
use crate::value::Value;

impl Deferred {
    /// Registers continuations and returns the deferred value that receives
    /// their result.
    ///
    /// A missing callback passes the outcome through unchanged.
    pub fn then(&self, on_fulfilled: Option<Callback>, on_rejected: Option<Callback>) -> Self {
        let downstream = Self::pending(self.runtime());
        self.attach(Handler::new(on_fulfilled, on_rejected, downstream.clone()));
        downstream
    }

    /// Registers a fulfillment continuation only.
    pub fn then_ok<F>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.then(Some(Callback::new(on_fulfilled)), None)
    }

    /// Registers a rejection continuation only.
    pub fn catch<F>(&self, on_rejected: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.then(None, Some(Callback::new(on_rejected)))
    }

    /// Runs `f` on either outcome, then passes the original outcome
    /// through. If `f` fails, the downstream is rejected with its error.
    pub fn finally<F>(&self, f: F) -> Self
    where
        F: FnOnce() -> Result<(), Value> + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(Some(f)));
        let on_fulfilled = {
            let shared = Arc::clone(&shared);
            Callback::new(move |value| {
                run_once(&shared)?;
                Ok(value)
            })
        };
        let on_rejected = Callback::new(move |reason| {
            run_once(&shared)?;
            Err(reason)
        });
        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Host-facing `then`: non-callable arguments are treated as absent.
    pub fn then_dynamic(&self, on_fulfilled: &Value, on_rejected: &Value) -> Self {
        self.then(
            Callback::from_value(on_fulfilled),
            Callback::from_value(on_rejected),
        )
    }

    pub(crate) fn attach(&self, handler: Handler) {
        let target = self.terminal();
        target.runtime().observers().notify_attach(&target);
        let settlement = {
            let mut guard = target.inner.slot.lock();
            let slot = &mut *guard;
            match &slot.state {
                State::Pending => {
                    slot.waiters.push(handler);
                    return;
                }
                State::Fulfilled(value) => Some(Settlement::Fulfilled(value.clone())),
                State::Rejected(reason) => Some(Settlement::Rejected(reason.clone())),
                // Adopted after `terminal()` returned; follow the new link.
                State::Adopted(_) => None,
            }
        };
        match settlement {
            Some(settlement) => target.dispatch(handler, settlement),
            None => target.attach(handler),
        }
    }

    fn dispatch(&self, handler: Handler, settlement: Settlement) {
        trace!(deferred = %self.id(), ?handler, "scheduling continuation");
        self.runtime()
            .schedule(Box::new(move || handler.run(settlement)));
    }

    /// Re-attaches every queued waiter, in attachment order.
    pub(crate) fn finalize(&self) {
        let waiters = std::mem::take(&mut self.inner.slot.lock().waiters);
        for handler in waiters {
            self.attach(handler);
        }
    }
}

fn run_once<F>(shared: &Mutex<Option<F>>) -> Result<(), Value>
where
    F: FnOnce() -> Result<(), Value>,
{
    let f = shared.lock().take();
    f.map_or(Ok(()), |f| f())
}

#[cfg(test)]
mod tests {
    use crate::deferred::{Deferred, DeferredState, Settlement};
    use crate::runtime::{FifoScheduler, Runtime};
    use crate::value::{ErrorClass, Function, Value};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn runtime() -> (Arc<FifoScheduler>, Runtime) {
        crate::test_utils::init_test_logging();
        let scheduler = Arc::new(FifoScheduler::new());
        let runtime = Runtime::new(Arc::clone(&scheduler));
        (scheduler, runtime)
    }

    #[test]
    fn callbacks_never_run_synchronously() {
        let (scheduler, rt) = runtime();
        let ran = Arc::new(Mutex::new(false));
        let d = Deferred::resolved(&rt, Value::from(1));
        let flag = Arc::clone(&ran);
        let _next = d.then_ok(move |v| {
            *flag.lock() = true;
            Ok(v)
        });
        assert!(!*ran.lock());
        scheduler.drain();
        assert!(*ran.lock());
    }

    #[test]
    fn waiters_are_dispatched_in_attachment_order() {
        let (scheduler, rt) = runtime();
        let (d, resolver) = Deferred::with_resolver(&rt);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let log = Arc::clone(&log);
            let _ = d.then_ok(move |v| {
                log.lock().push(i);
                Ok(v)
            });
        }
        assert_eq!(d.waiter_count(), 4);
        resolver.resolve(Value::Null);
        assert!(!d.has_waiters());
        scheduler.drain();
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn missing_callbacks_pass_outcome_through() {
        let (scheduler, rt) = runtime();
        let ok = Deferred::resolved(&rt, Value::from(1)).catch(|_| Ok(Value::from(0)));
        let err = Deferred::rejected(&rt, Value::from("e")).then_ok(|_| Ok(Value::from(0)));
        scheduler.drain();
        assert_eq!(ok.settlement(), Some(Settlement::Fulfilled(Value::from(1))));
        assert_eq!(err.settlement(), Some(Settlement::Rejected(Value::from("e"))));
    }

    #[test]
    fn callback_result_resolves_downstream() {
        let (scheduler, rt) = runtime();
        let inner = Deferred::resolved(&rt, Value::from(10));
        let chained = Deferred::resolved(&rt, Value::from(1)).then_ok(move |_| Ok(Value::from(inner)));
        scheduler.drain();
        assert_eq!(chained.state(), DeferredState::Adopted);
        assert_eq!(
            chained.settlement(),
            Some(Settlement::Fulfilled(Value::from(10)))
        );
    }

    #[test]
    fn callback_error_rejects_downstream() {
        let (scheduler, rt) = runtime();
        let d = Deferred::resolved(&rt, Value::from(1)).then_ok(|_| Err(Value::from("boom")));
        scheduler.drain();
        assert_eq!(d.settlement(), Some(Settlement::Rejected(Value::from("boom"))));
    }

    #[test]
    fn callback_panic_rejects_downstream() {
        let (scheduler, rt) = runtime();
        let d = Deferred::resolved(&rt, Value::from(1)).then_ok(|_| panic!("handler panicked"));
        scheduler.drain();
        let reason = d.settlement().and_then(|s| s.into_result().err());
        assert_eq!(
            reason.as_ref().and_then(Value::as_error).map(|e| e.class()),
            Some(ErrorClass::Panic)
        );
    }

    #[test]
    fn attach_to_adopter_goes_to_terminal() {
        let (scheduler, rt) = runtime();
        let (inner, inner_resolver) = Deferred::with_resolver(&rt);
        let outer = Deferred::resolved(&rt, Value::from(inner.clone()));
        let next = outer.then_ok(Ok);
        assert_eq!(outer.waiter_count(), 0);
        assert_eq!(inner.waiter_count(), 1);
        inner_resolver.resolve(Value::from("done"));
        scheduler.drain();
        assert_eq!(
            next.settlement(),
            Some(Settlement::Fulfilled(Value::from("done")))
        );
    }

    #[test]
    fn adoption_moves_waiters_to_target() {
        let (scheduler, rt) = runtime();
        let (outer, outer_resolver) = Deferred::with_resolver(&rt);
        let (inner, inner_resolver) = Deferred::with_resolver(&rt);
        let next = outer.then_ok(Ok);
        outer_resolver.resolve(Value::from(inner.clone()));
        assert_eq!(inner.waiter_count(), 1);
        inner_resolver.reject(Value::from("inner failed"));
        scheduler.drain();
        assert_eq!(
            next.settlement(),
            Some(Settlement::Rejected(Value::from("inner failed")))
        );
    }

    #[test]
    fn finally_passes_outcome_through() {
        let (scheduler, rt) = runtime();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let d = Deferred::rejected(&rt, Value::from("kept")).finally(move || {
            *counter.lock() += 1;
            Ok(())
        });
        scheduler.drain();
        assert_eq!(*calls.lock(), 1);
        assert_eq!(d.settlement(), Some(Settlement::Rejected(Value::from("kept"))));
    }

    #[test]
    fn finally_error_replaces_outcome() {
        let (scheduler, rt) = runtime();
        let d = Deferred::resolved(&rt, Value::from(1)).finally(|| Err(Value::from("cleanup")));
        scheduler.drain();
        assert_eq!(d.settlement(), Some(Settlement::Rejected(Value::from("cleanup"))));
    }

    #[test]
    fn then_dynamic_ignores_non_callables() {
        let (scheduler, rt) = runtime();
        let double = Value::from(Function::from_unary(|v| {
            Ok(Value::from(v.as_number().unwrap_or_default() * 2.0))
        }));
        let a = Deferred::resolved(&rt, Value::from(4)).then_dynamic(&double, &Value::Null);
        let b = Deferred::resolved(&rt, Value::from(4)).then_dynamic(&Value::from(5), &double);
        scheduler.drain();
        assert_eq!(a.settlement(), Some(Settlement::Fulfilled(Value::from(8))));
        assert_eq!(b.settlement(), Some(Settlement::Fulfilled(Value::from(4))));
    }

    #[test]
    fn downstream_shares_runtime() {
        let (_scheduler, rt) = runtime();
        let d = Deferred::resolved(&rt, Value::Null).then(None, None);
        assert!(d.runtime().ptr_eq(&rt));
    }
}
