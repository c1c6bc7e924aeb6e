//! Error types for mock operations.

use std::fmt;
use thiserror::Error;

/// An exception installed as a side effect, or raised by a host object.
///
/// Exceptions are identified by their `kind` (`"TypeError"`, `"Timeout"`, ...)
/// so tests can assert on what was raised without sharing concrete types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: String,
    message: Option<String>,
}

impl Exception {
    /// Create an exception of the given kind without a message.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: None,
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => f.write_str(&self.kind),
        }
    }
}

impl std::error::Error for Exception {}

/// The error type for mock operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Attribute outside the spec, or an unsupported dunder name.
    #[error("'{owner}' has no attribute '{attribute}'")]
    AttributeNotFound { owner: String, attribute: String },

    /// Attribute name that looks like a misspelled assertion.
    #[error(
        "'{attribute}' is not a valid assertion. Use a spec for the mock if '{attribute}' is meant to be an attribute."
    )]
    UnsafeAttribute { attribute: String },

    /// Attribute holds plain data where a mock was required.
    #[error("attribute '{attribute}' of '{mock}' is not a mock")]
    NotAMock { mock: String, attribute: String },

    /// Value cannot be invoked.
    #[error("{value} is not callable")]
    NotCallable { value: String },

    /// Arguments do not bind to the spec's signature.
    #[error("signature mismatch calling '{target}': {reason}")]
    SignatureMismatch { target: String, reason: String },

    /// A call-history assertion did not hold.
    #[error("{0}")]
    AssertionFailed(String),

    /// A configured (or host-raised) exception.
    #[error("{0}")]
    Raised(Exception),

    /// Sequence side effect has no items left.
    #[error("side effect of '{mock}' is exhausted")]
    SideEffectExhausted { mock: String },

    /// Protocol operation not supported by this mock flavor.
    #[error("'{mock}' does not support {protocol}")]
    Unsupported { mock: String, protocol: String },

    /// Protocol method returned a value of the wrong shape.
    #[error("{protocol} should return {expected}, got {found}")]
    Conversion {
        protocol: String,
        expected: String,
        found: String,
    },

    /// Mock configuration error.
    #[error("invalid mock configuration: {0}")]
    InvalidConfig(String),

    /// No module registered under this name.
    #[error("No module named '{module}'")]
    ModuleNotFound { module: String },

    /// Patch target could not be resolved or replaced.
    #[error("cannot patch '{target}': {reason}")]
    PatchTarget { target: String, reason: String },
}

impl Error {
    /// Create an assertion failure.
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::AssertionFailed(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a patch target error.
    pub fn patch(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PatchTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// The raised exception, if this error carries one.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Self::Raised(exception) => Some(exception),
            _ => None,
        }
    }

    /// Whether this error is a raised exception of the given kind.
    pub fn is_raised(&self, kind: &str) -> bool {
        self.exception().is_some_and(|e| e.kind() == kind)
    }
}

impl From<Exception> for Error {
    fn from(exception: Exception) -> Self {
        Self::Raised(exception)
    }
}

/// Result type alias using mimic's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_display() {
        assert_eq!(Exception::new("TypeError").to_string(), "TypeError");
        assert_eq!(
            Exception::new("Timeout").with_message("read timed out").to_string(),
            "Timeout: read timed out"
        );
    }

    #[test]
    fn test_is_raised() {
        let err: Error = Exception::new("TypeError").into();
        assert!(err.is_raised("TypeError"));
        assert!(!err.is_raised("ValueError"));
        assert!(!Error::assertion("nope").is_raised("TypeError"));
    }

    #[test]
    fn test_attribute_error_message() {
        let err = Error::AttributeNotFound {
            owner: "mock".into(),
            attribute: "attr_3".into(),
        };
        assert_eq!(err.to_string(), "'mock' has no attribute 'attr_3'");
    }
}
