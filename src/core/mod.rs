//! Core types shared by every breaker.
//!
//! - [`outcome`] - The `Outcome` sum type returned by protected calls
//! - [`error`] - Construction errors
//! - [`clock`] - Injectable time sources

pub mod clock;
pub mod error;
pub mod outcome;

pub use clock::{ArcClock, Clock, ManualClock, SystemClock};
pub use error::{BreakerError, BreakerResult};
pub use outcome::{Fallback, FallbackCause, Outcome};
