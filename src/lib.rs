//! # Tripwire
//!
//! A circuit breaker that protects callers from repeatedly invoking a failing
//! or slow downstream operation.
//!
//! ## Overview
//!
//! A [`CircuitBreaker`] wraps calls to one downstream resource. It counts
//! failures and, once a threshold is crossed, stops invoking the operation and
//! returns a fallback instead. After a retry timeout it lets a trial call
//! through; enough successful trials close the circuit again.
//!
//! Calls never return the operation's error. Every call yields an
//! [`Outcome`]: either `Success(value)` or `Degraded(fallback)`.
//!
//! ## Quick Start
//!
//! ```rust
//! use tripwire::prelude::*;
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new(3, Duration::from_secs(5), 2);
//! let breaker = CircuitBreaker::new(config).expect("valid config");
//!
//! match breaker.execute(|| Ok::<_, std::io::Error>("pong")) {
//!     Outcome::Success(reply) => assert_eq!(reply, "pong"),
//!     Outcome::Degraded(fallback) => panic!("unexpected fallback: {fallback}"),
//! }
//!
//! let metrics = breaker.metrics();
//! assert_eq!(metrics.state, CircuitState::Closed);
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support
//! - `tokio-runtime` - [`AsyncCircuitBreaker`] for async operations
//!
//! ## Architecture
//!
//! - **Core**: The `Outcome` type, construction errors, and clocks
//! - **Circuit Breaker**: The state machine, the blocking and async
//!   executors, configuration, and metrics

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod circuit_breaker;
pub mod core;

// Re-export commonly used types at the crate root
pub use crate::core::{
    BreakerError, BreakerResult, Clock, Fallback, FallbackCause, ManualClock, Outcome, SystemClock,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::circuit_breaker::AsyncCircuitBreaker;
pub use crate::circuit_breaker::{
    BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState, MetricsSnapshot,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use tripwire::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "tokio-runtime")]
    pub use crate::circuit_breaker::AsyncCircuitBreaker;
    pub use crate::circuit_breaker::{
        BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState, MetricsSnapshot,
    };
    pub use crate::core::{BreakerError, Fallback, FallbackCause, Outcome};
}
