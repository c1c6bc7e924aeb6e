//! Proptest strategies for mock inputs.

use std::collections::BTreeSet;

use mimic_core::{Call, Value};
use proptest::prelude::*;

/// Attribute names that a plain mock accepts: lower snake case, not dunder,
/// and not starting with an assertion-like prefix.
pub fn attribute_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("assertion-like prefix", |name| {
        !name.starts_with("as")
    })
}

/// A set of distinct attribute names.
pub fn distinct_attribute_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(attribute_name(), 1..=max.max(1))
        .prop_map(|names: BTreeSet<String>| names.into_iter().collect())
}

/// Scalar data values.
pub fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::none()),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ]
}

/// Calls with up to four positional and two keyword arguments.
pub fn call_args() -> impl Strategy<Value = Call> {
    (
        prop::collection::vec(scalar_value(), 0..4),
        prop::collection::btree_map("[a-z]{1,6}", scalar_value(), 0..2),
    )
        .prop_map(|(args, kwargs)| {
            let call = args.into_iter().fold(Call::new(), |call, value| call.arg(value));
            kwargs
                .into_iter()
                .fold(call, |call, (key, value)| call.kwarg(key, value))
        })
}
