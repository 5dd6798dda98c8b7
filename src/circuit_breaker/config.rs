//! Circuit breaker configuration.

use crate::core::{BreakerError, BreakerResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message returned in place of a result when a call is degraded.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Service is unavailable. Returning fallback response.";

/// Configuration for a circuit breaker.
///
/// On the wire the retry timeout is expressed in milliseconds:
///
/// ```json
/// { "failure_threshold": 3, "success_threshold": 2, "retry_timeout_ms": 5000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit.
    pub failure_threshold: u32,

    /// Number of successes in half-open state to close the circuit.
    pub success_threshold: u32,

    /// How long the circuit stays open before a trial call is allowed.
    #[serde(rename = "retry_timeout_ms", with = "duration_ms")]
    pub retry_timeout: Duration,

    /// Message carried by every degraded outcome.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            retry_timeout: Duration::from_secs(30),
            fallback_message: default_fallback_message(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a configuration from the three required parameters.
    pub fn new(failure_threshold: u32, retry_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            retry_timeout,
            ..Self::default()
        }
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the retry timeout.
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// Sets the fallback message.
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    /// Creates a configuration that trips early and recovers cautiously.
    ///
    /// This configuration:
    /// - Opens after 3 failures
    /// - Stays open for 60 seconds
    /// - Needs 5 successful trial calls to close
    pub fn strict() -> Self {
        Self::new(3, Duration::from_secs(60), 5)
    }

    /// Creates a configuration that tolerates noise and recovers quickly.
    ///
    /// This configuration:
    /// - Opens after 10 failures
    /// - Stays open for 10 seconds
    /// - Needs 2 successful trial calls to close
    pub fn high_availability() -> Self {
        Self::new(10, Duration::from_secs(10), 2)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> BreakerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every threshold is usable.
    pub fn validate(&self) -> BreakerResult<()> {
        if self.failure_threshold == 0 {
            return Err(BreakerError::invalid_config(
                "failure_threshold",
                "must be greater than zero",
            ));
        }
        if self.success_threshold == 0 {
            return Err(BreakerError::invalid_config(
                "success_threshold",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 3);
        assert_eq!(config.retry_timeout, Duration::from_secs(30));
        assert_eq!(config.fallback_message, DEFAULT_FALLBACK_MESSAGE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CircuitBreakerConfig::new(3, Duration::from_secs(5), 2)
            .with_failure_threshold(10)
            .with_retry_timeout(Duration::from_secs(60))
            .with_fallback_message("down");

        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.retry_timeout, Duration::from_secs(60));
        assert_eq!(config.fallback_message, "down");
    }

    #[test]
    fn test_zero_thresholds_rejected() {
        let err = CircuitBreakerConfig::new(0, Duration::from_secs(1), 1)
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("failure_threshold"));

        let err = CircuitBreakerConfig::new(1, Duration::from_secs(1), 0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("success_threshold"));
    }

    #[test]
    fn test_zero_retry_timeout_allowed() {
        let config = CircuitBreakerConfig::new(1, Duration::ZERO, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(CircuitBreakerConfig::strict().validate().is_ok());
        assert!(CircuitBreakerConfig::high_availability().validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = CircuitBreakerConfig::from_json_str(
            r#"{ "failure_threshold": 3, "success_threshold": 2, "retry_timeout_ms": 5000 }"#,
        )
        .unwrap();

        assert_eq!(config, CircuitBreakerConfig::new(3, Duration::from_secs(5), 2));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = CircuitBreakerConfig::from_json_str(
            r#"{ "failure_threshold": 0, "success_threshold": 2, "retry_timeout_ms": 10 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, BreakerError::InvalidConfig { .. }));

        let err = CircuitBreakerConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, BreakerError::ConfigParse(_)));
    }

    #[test]
    fn test_serializes_retry_timeout_as_millis() {
        let config = CircuitBreakerConfig::new(3, Duration::from_millis(1500), 2);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["retry_timeout_ms"], 1500);
    }
}
