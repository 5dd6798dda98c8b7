//! Error types for the tripwire library.
//!
//! Only construction can fail. Errors produced by a protected operation are
//! absorbed by the breaker and surface as [`Outcome::Degraded`], never as a
//! [`BreakerError`].
//!
//! [`Outcome::Degraded`]: crate::core::Outcome::Degraded

use thiserror::Error;

/// The error type for building a circuit breaker.
#[derive(Debug, Error)]
pub enum BreakerError {
    /// A configuration value is out of range.
    #[error("invalid circuit breaker configuration: {field} {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A serialized configuration could not be parsed.
    #[error("failed to parse circuit breaker configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl BreakerError {
    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the name of the rejected field, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig { field, .. } => Some(field),
            Self::ConfigParse(_) => None,
        }
    }
}

/// A specialized `Result` type for breaker construction.
pub type BreakerResult<T> = Result<T, BreakerError>;
