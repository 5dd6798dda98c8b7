//! Circuit breaker state machine.
//!
//! [`BreakerState`] holds everything the breaker mutates. It does no locking
//! and never reads the clock; callers pass `now` in and hold whatever lock
//! guards the record for the whole admit/invoke/record sequence.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::metrics::{BreakerStats, MetricsSnapshot};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// The position of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed; calls pass through normally.
    #[default]
    Closed,
    /// Circuit is open; calls are short-circuited.
    Open,
    /// Circuit is half-open; trial calls decide whether to close or reopen.
    HalfOpen,
}

impl CircuitState {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Open => "Open",
            Self::HalfOpen => "HalfOpen",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a call may reach the wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The circuit is closed or half-open; invoke the operation.
    Allowed,
    /// The retry timeout elapsed; the circuit moved to half-open and this
    /// call is the trial call.
    Trial,
    /// The circuit is open; do not invoke the operation.
    Rejected,
}

/// A change of [`CircuitState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the change.
    pub from: CircuitState,
    /// State after the change.
    pub to: CircuitState,
}

/// The mutable record behind a circuit breaker.
#[derive(Debug, Clone, Default)]
pub struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    stats: BreakerStats,
}

impl BreakerState {
    /// Creates a new closed state.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns the failure count.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns the half-open success count.
    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    /// Returns when the circuit last opened.
    pub fn last_failure_time(&self) -> Option<Instant> {
        self.last_failure_time
    }

    /// Returns the lifetime counters.
    pub fn stats(&self) -> &BreakerStats {
        &self.stats
    }

    /// Returns a point-in-time view of the counters and state.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            failure_count: self.failure_count,
            success_count: self.success_count,
            state: self.state,
        }
    }

    /// Decides whether a call arriving at `now` may proceed.
    ///
    /// An open circuit whose retry timeout has elapsed moves to half-open
    /// here, and the caller becomes the trial call.
    pub fn admit(&mut self, now: Instant, config: &CircuitBreakerConfig) -> Admission {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => Admission::Allowed,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_time
                    .map(|opened| now.saturating_duration_since(opened));
                match elapsed {
                    Some(elapsed) if elapsed < config.retry_timeout => {
                        self.stats.record_rejected();
                        Admission::Rejected
                    }
                    _ => {
                        self.state = CircuitState::HalfOpen;
                        self.success_count = 0;
                        Admission::Trial
                    }
                }
            }
        }
    }

    /// Records a successful call.
    pub fn on_success(&mut self, config: &CircuitBreakerConfig) -> Option<Transition> {
        self.stats.record_success();

        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
                None
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.close();
                    Some(Transition {
                        from: CircuitState::HalfOpen,
                        to: CircuitState::Closed,
                    })
                } else {
                    None
                }
            }
            // Calls are never admitted while open.
            CircuitState::Open => None,
        }
    }

    /// Records a failed call that completed at `now`.
    ///
    /// Any failure while half-open reopens the circuit immediately.
    pub fn on_failure(&mut self, now: Instant, config: &CircuitBreakerConfig) -> Option<Transition> {
        self.stats.record_failure();
        self.failure_count = self.failure_count.saturating_add(1);

        match self.state {
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.open(now);
                Some(Transition {
                    from: CircuitState::Closed,
                    to: CircuitState::Open,
                })
            }
            CircuitState::Closed => None,
            CircuitState::HalfOpen => {
                self.open(now);
                Some(Transition {
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Open,
                })
            }
            CircuitState::Open => None,
        }
    }

    /// Opens the circuit at `now` regardless of the counters.
    pub fn force_open(&mut self, now: Instant) -> Option<Transition> {
        let from = self.state;
        self.open(now);
        (from != CircuitState::Open).then_some(Transition {
            from,
            to: CircuitState::Open,
        })
    }

    /// Closes the circuit and clears both counters.
    pub fn force_close(&mut self) -> Option<Transition> {
        let from = self.state;
        if from == CircuitState::Closed {
            self.failure_count = 0;
            self.success_count = 0;
            return None;
        }
        self.close();
        Some(Transition {
            from,
            to: CircuitState::Closed,
        })
    }

    /// Restores the initial closed state and clears the lifetime counters.
    pub fn reset(&mut self) {
        *self = Self::closed();
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.success_count = 0;
        self.last_failure_time = Some(now);
        self.stats.record_opened();
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.success_count = 0;
        self.stats.record_closed();
    }
}
