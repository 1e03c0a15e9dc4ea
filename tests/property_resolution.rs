//! Property tests for resolution and dispatch.
//!
//! - Non-thenable values fulfill as themselves
//! - Rejection reasons pass through untouched
//! - Continuations dispatch once each, in attachment order
//! - Adoption chains of any depth settle with the tail's outcome

#[macro_use]
mod common;

use common::*;
use deferred::value::{ErrorValue, Object, Record};
use deferred::{Deferred, DeferredState, Value};
use proptest::prelude::*;

fn arb_plain_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1.0e9..1.0e9f64).prop_map(Value::from),
        Just(Value::from(f64::NAN)),
        Just(Value::from(-0.0)),
        "[a-z0-9 ]{0,16}".prop_map(Value::from),
        "[a-z ]{0,16}".prop_map(|msg| Value::from(ErrorValue::error(msg))),
        "[a-z]{1,8}".prop_map(|key| {
            Value::from(Object::new(Record::new().with(key, Value::Null)))
        }),
    ]
}

proptest! {
    #![proptest_config(test_proptest_config(200))]

    /// Resolving with a value that has no `then` fulfills with that value.
    #[test]
    fn plain_values_fulfill_as_themselves(value in arb_plain_value()) {
        let (host, runtime) = test_lab();
        let d = Deferred::resolved(&runtime, value.clone());
        prop_assert_eq!(fulfilled(&d), value.clone());

        let seen = d.then_ok(Ok);
        host.run_until_idle();
        prop_assert_eq!(fulfilled(&seen), value);
    }

    /// Rejection reasons are never interpreted.
    #[test]
    fn rejection_reasons_pass_through(reason in arb_plain_value()) {
        let (host, runtime) = test_lab();
        let d = Deferred::rejected(&runtime, reason.clone());
        let tail = d.then_ok(Ok).then_ok(Ok);
        host.run_until_idle();
        prop_assert_eq!(rejected(&tail), reason);
    }
}

proptest! {
    #![proptest_config(test_proptest_config(100))]

    /// N continuations run exactly once each, in the order attached,
    /// whether attached before or after settlement.
    #[test]
    fn continuations_keep_attachment_order(before in 0usize..16, after in 0usize..16) {
        let (host, runtime) = test_lab();
        let log = EventLog::new();
        let (d, resolver) = Deferred::with_resolver(&runtime);

        for i in 0..before {
            let _ = log.observe(&d, &format!("b{i}"));
        }
        resolver.resolve(Value::from(7));
        for i in 0..after {
            let _ = log.observe(&d, &format!("a{i}"));
        }
        prop_assert_eq!(log.len(), 0);

        host.run_until_idle();
        let expected: Vec<String> = (0..before)
            .map(|i| format!("b{i}:ok:7"))
            .chain((0..after).map(|i| format!("a{i}:ok:7")))
            .collect();
        prop_assert_eq!(log.events(), expected);

        host.run_until_idle();
        prop_assert_eq!(log.len(), before + after);
    }

    /// A chain of adoptions settles every link with the tail's outcome.
    #[test]
    fn adoption_chains_settle_with_tail(depth in 1usize..32, reject in any::<bool>()) {
        let (host, runtime) = test_lab();
        let (tail, tail_resolver) = Deferred::with_resolver(&runtime);
        let mut links = vec![tail.clone()];
        for _ in 0..depth {
            let (link, resolver) = Deferred::with_resolver(&runtime);
            resolver.resolve(Value::from(links[links.len() - 1].clone()));
            links.push(link);
        }
        let head = links[links.len() - 1].clone();
        let log = EventLog::new();
        let _ = log.observe(&head, "head");

        host.run_until_idle();
        prop_assert!(head.settlement().is_none());
        prop_assert_eq!(head.state(), DeferredState::Adopted);

        if reject {
            tail_resolver.reject(Value::from("no"));
        } else {
            tail_resolver.resolve(Value::from("yes"));
        }
        host.run_until_idle();

        for link in &links {
            prop_assert_eq!(link.settlement(), tail.settlement());
        }
        let expected = if reject { "head:err:no" } else { "head:ok:yes" };
        prop_assert_eq!(log.events(), vec![expected.to_string()]);
    }
}
