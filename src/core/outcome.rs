//! The value returned by every protected call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a call produced a fallback instead of a real result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCause {
    /// The circuit was open and the operation was never invoked.
    CircuitOpen,
    /// The operation was invoked and returned an error.
    OperationFailed,
}

impl fmt::Display for FallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::OperationFailed => write!(f, "operation failed"),
        }
    }
}

/// The fallback handed back in place of a real result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// The configured fallback message.
    pub message: String,
    /// What caused the fallback.
    pub cause: FallbackCause,
}

impl Fallback {
    /// Creates a new fallback.
    pub fn new(message: impl Into<String>, cause: FallbackCause) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.cause)
    }
}

/// The result of a call made through a circuit breaker.
///
/// A call either reaches the operation and succeeds, or it is degraded to
/// the breaker's fallback. Errors from the operation are never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The operation ran and returned a value.
    Success(R),
    /// The call was short-circuited or the operation failed.
    Degraded(Fallback),
}

impl<R> Outcome<R> {
    /// Returns `true` if the operation ran and succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if the call produced the fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Returns the fallback cause, if degraded.
    pub fn cause(&self) -> Option<FallbackCause> {
        match self {
            Self::Success(_) => None,
            Self::Degraded(fallback) => Some(fallback.cause),
        }
    }

    /// Converts into the successful value, discarding the fallback.
    pub fn success(self) -> Option<R> {
        match self {
            Self::Success(value) => Some(value),
            Self::Degraded(_) => None,
        }
    }

    /// Converts into the fallback, discarding any successful value.
    pub fn degraded(self) -> Option<Fallback> {
        match self {
            Self::Success(_) => None,
            Self::Degraded(fallback) => Some(fallback),
        }
    }

    /// Maps the successful value, leaving a fallback untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(R) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Degraded(fallback) => Outcome::Degraded(fallback),
        }
    }

    /// Returns the successful value or computes one from the fallback.
    pub fn unwrap_or_else<F>(self, f: F) -> R
    where
        F: FnOnce(Fallback) -> R,
    {
        match self {
            Self::Success(value) => value,
            Self::Degraded(fallback) => f(fallback),
        }
    }

    /// Converts into a `Result`, with the fallback as the error.
    pub fn into_result(self) -> Result<R, Fallback> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Degraded(fallback) => Err(fallback),
        }
    }
}

impl<R> From<Outcome<R>> for Result<R, Fallback> {
    fn from(outcome: Outcome<R>) -> Self {
        outcome.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_accessors() {
        let outcome = Outcome::Success(7);
        assert!(outcome.is_success());
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.cause(), None);
        assert_eq!(outcome.map(|v| v * 2).success(), Some(14));
    }

    #[test]
    fn test_degraded_accessors() {
        let outcome: Outcome<u32> =
            Outcome::Degraded(Fallback::new("unavailable", FallbackCause::CircuitOpen));
        assert!(outcome.is_degraded());
        assert_eq!(outcome.cause(), Some(FallbackCause::CircuitOpen));

        let value = outcome.clone().unwrap_or_else(|f| f.message.len() as u32);
        assert_eq!(value, 11);

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.message, "unavailable");
    }

    #[test]
    fn test_fallback_display() {
        let fallback = Fallback::new("try later", FallbackCause::OperationFailed);
        assert_eq!(fallback.to_string(), "try later (operation failed)");
    }

    #[test]
    fn test_cause_serializes_snake_case() {
        let json = serde_json::to_string(&FallbackCause::CircuitOpen).unwrap();
        assert_eq!(json, "\"circuit_open\"");
    }
}
