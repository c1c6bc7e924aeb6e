//! Assertion helpers for mock results.

pub use assert_matches::assert_matches;
pub use pretty_assertions::{assert_eq, assert_ne};

use mimic_core::{Call, Error, Mock};

/// Assert that a result is an error whose message contains `$expected`.
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($expected),
                    "Expected error message to contain '{}', but got: '{}'",
                    $expected,
                    error_msg
                );
            }
        }
    };
}

/// Assert that a result is a raised exception of the given kind.
#[macro_export]
macro_rules! assert_raises {
    ($result:expr, $kind:expr) => {
        match $result {
            Ok(v) => panic!("Expected {} to be raised but got Ok({:?})", $kind, v),
            Err(e) => assert!(
                e.is_raised($kind),
                "Expected {} to be raised, but got: '{}'",
                $kind,
                e
            ),
        }
    };
}

/// Assert that a result is `Error::AttributeNotFound` for `$attribute`.
#[macro_export]
macro_rules! assert_attribute_error {
    ($result:expr, $attribute:expr) => {
        match $result {
            Err(::mimic_core::Error::AttributeNotFound { attribute, .. }) => {
                assert_eq!(attribute, $attribute)
            }
            Err(e) => panic!("Expected AttributeNotFound, got: '{}'", e),
            Ok(_) => panic!("Expected AttributeNotFound for '{}' but got Ok", $attribute),
        }
    };
}

/// Assert that a result is `Error::SignatureMismatch`.
#[macro_export]
macro_rules! assert_signature_mismatch {
    ($result:expr) => {
        match $result {
            Err(::mimic_core::Error::SignatureMismatch { .. }) => {}
            Err(e) => panic!("Expected SignatureMismatch, got: '{}'", e),
            Ok(_) => panic!("Expected SignatureMismatch but got Ok"),
        }
    };
}

/// Panic with the assertion message if a mock assertion failed.
///
/// Keeps test bodies free of `unwrap()` noise on `assert_*` results.
pub fn verify(result: Result<(), Error>) {
    if let Err(e) = result {
        panic!("{}", e);
    }
}

/// Direct calls of `mock`, rendered the way failure messages show them.
pub fn rendered_calls(mock: &Mock) -> Vec<String> {
    mock.call_args_list().iter().map(Call::to_string).collect()
}
