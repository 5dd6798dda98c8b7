//! Circuit breaker implementation.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! stopping traffic to a failing resource and periodically letting a trial
//! call through to detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through.
//! - **Open**: The resource is failing; calls return the fallback immediately.
//! - **Half-Open**: Trial calls decide whether to close or reopen.
//!
//! Transitions are evaluated lazily when a call arrives. There is no
//! background timer.
//!
//! ## Usage
//!
//! ```rust
//! use tripwire::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::default()
//!     .with_failure_threshold(3)
//!     .with_retry_timeout(Duration::from_secs(5));
//! let breaker = CircuitBreaker::new(config).unwrap();
//!
//! for _ in 0..3 {
//!     breaker.execute(|| Err::<(), _>("connection refused"));
//! }
//! assert_eq!(breaker.metrics().state, CircuitState::Open);
//! ```

#[cfg(feature = "tokio-runtime")]
mod async_breaker;
mod breaker;
mod config;
mod metrics;
mod state;

#[cfg(feature = "tokio-runtime")]
pub use async_breaker::AsyncCircuitBreaker;
pub use breaker::CircuitBreaker;
pub use config::{CircuitBreakerConfig, DEFAULT_FALLBACK_MESSAGE};
pub use metrics::{BreakerStats, MetricsSnapshot};
pub use state::{Admission, BreakerState, CircuitState, Transition};
