//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::metrics::{BreakerStats, MetricsSnapshot};
use crate::circuit_breaker::state::{Admission, BreakerState, CircuitState, Transition};
use crate::core::{
    ArcClock, BreakerResult, Clock, Fallback, FallbackCause, Outcome, SystemClock,
};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Instant;

/// Name used in log events when none is given.
pub(crate) const DEFAULT_NAME: &str = "default";

/// A circuit breaker guarding calls to one downstream resource.
///
/// Every call to [`execute`](Self::execute) holds the breaker's lock from the
/// admission check until the outcome is recorded, including while the
/// operation runs. Calls through one breaker are therefore serialized, and
/// at most one trial call is ever in flight after the circuit opens.
///
/// # States
///
/// - **Closed**: Normal operation. Calls pass through, failures are counted.
/// - **Open**: The resource is failing. Calls return the fallback immediately.
/// - **Half-Open**: The retry timeout elapsed. Trial calls run; enough
///   successes close the circuit, any failure reopens it.
///
/// # Example
///
/// ```rust
/// use tripwire::{CircuitBreaker, CircuitBreakerConfig, Outcome};
/// use std::time::Duration;
///
/// let config = CircuitBreakerConfig::new(3, Duration::from_secs(5), 2);
/// let breaker = CircuitBreaker::new(config).unwrap();
///
/// let outcome = breaker.execute(|| Ok::<_, std::io::Error>("pong"));
/// assert_eq!(outcome, Outcome::Success("pong"));
/// ```
pub struct CircuitBreaker {
    /// Name of the protected resource, used in log events.
    name: String,
    /// Current state and counters.
    state: Mutex<BreakerState>,
    /// Configuration.
    config: CircuitBreakerConfig,
    /// Source of `now` for timeout checks.
    clock: ArcClock,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker backed by the system clock.
    pub fn new(config: CircuitBreakerConfig) -> BreakerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new circuit breaker that reads time from `clock`.
    pub fn with_clock(config: CircuitBreakerConfig, clock: ArcClock) -> BreakerResult<Self> {
        config.validate()?;
        Ok(Self {
            name: DEFAULT_NAME.to_string(),
            state: Mutex::new(BreakerState::closed()),
            config,
            clock,
        })
    }

    /// Sets the resource name reported in log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Runs `operation` through the breaker.
    ///
    /// Returns [`Outcome::Success`] when the operation runs and succeeds.
    /// Returns [`Outcome::Degraded`] when the circuit is open (the operation
    /// is not invoked) or when the operation fails. The operation's error is
    /// logged and dropped.
    ///
    /// If the operation panics, the panic propagates to the caller and the
    /// call is recorded as neither a success nor a failure.
    pub fn execute<R, E, F>(&self, operation: F) -> Outcome<R>
    where
        F: FnOnce() -> Result<R, E>,
        E: fmt::Debug,
    {
        let mut state = self.lock();
        if let Some(fallback) = admit_call(&mut state, self.clock.now(), &self.config, &self.name) {
            return Outcome::Degraded(fallback);
        }

        let result = operation();
        record_result(&mut state, result, &*self.clock, &self.config, &self.name)
    }

    /// Returns a consistent snapshot of the counters and state.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.lock().snapshot()
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state()
    }

    /// Returns a copy of the lifetime counters.
    pub fn stats(&self) -> BreakerStats {
        self.lock().stats().clone()
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&self) {
        let mut state = self.lock();
        if let Some(transition) = state.force_open(self.clock.now()) {
            log_transition(&self.name, transition, &state);
        }
    }

    /// Forces the circuit into the closed state.
    pub fn force_close(&self) {
        let mut state = self.lock();
        if let Some(transition) = state.force_close() {
            log_transition(&self.name, transition, &state);
        }
    }

    /// Resets the circuit breaker state and counters.
    pub fn reset(&self) {
        self.lock().reset();
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CircuitBreaker");
        debug.field("name", &self.name);
        // `execute` holds the lock while the operation runs.
        match self.state.try_lock() {
            Ok(state) => {
                debug.field("state", &*state);
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                debug.field("state", &*poisoned.into_inner());
            }
            Err(TryLockError::WouldBlock) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.field("config", &self.config).finish()
    }
}

/// Checks whether a call arriving at `now` may run.
///
/// Returns the fallback when the circuit short-circuits the call.
pub(crate) fn admit_call(
    state: &mut BreakerState,
    now: Instant,
    config: &CircuitBreakerConfig,
    name: &str,
) -> Option<Fallback> {
    match state.admit(now, config) {
        Admission::Rejected => {
            tracing::debug!(
                breaker = %name,
                failure_count = state.failure_count(),
                "Circuit open, short-circuiting call"
            );
            Some(Fallback::new(
                config.fallback_message.clone(),
                FallbackCause::CircuitOpen,
            ))
        }
        Admission::Trial => {
            log_transition(
                name,
                Transition {
                    from: CircuitState::Open,
                    to: CircuitState::HalfOpen,
                },
                state,
            );
            None
        }
        Admission::Allowed => None,
    }
}

/// Feeds the operation's result into the state machine and builds the outcome.
pub(crate) fn record_result<R, E>(
    state: &mut BreakerState,
    result: Result<R, E>,
    clock: &dyn Clock,
    config: &CircuitBreakerConfig,
    name: &str,
) -> Outcome<R>
where
    E: fmt::Debug,
{
    match result {
        Ok(value) => {
            if let Some(transition) = state.on_success(config) {
                log_transition(name, transition, state);
            }
            Outcome::Success(value)
        }
        Err(error) => {
            tracing::debug!(breaker = %name, error = ?error, "Protected operation failed");
            if let Some(transition) = state.on_failure(clock.now(), config) {
                log_transition(name, transition, state);
            }
            Outcome::Degraded(Fallback::new(
                config.fallback_message.clone(),
                FallbackCause::OperationFailed,
            ))
        }
    }
}

/// Emits the log event for a state change.
pub(crate) fn log_transition(name: &str, transition: Transition, state: &BreakerState) {
    match transition.to {
        CircuitState::Open => tracing::warn!(
            breaker = %name,
            from = %transition.from,
            failure_count = state.failure_count(),
            "Circuit opened"
        ),
        CircuitState::HalfOpen => tracing::info!(
            breaker = %name,
            failure_count = state.failure_count(),
            "Circuit half-open, dispatching trial call"
        ),
        CircuitState::Closed => tracing::info!(
            breaker = %name,
            from = %transition.from,
            "Circuit closed"
        ),
    }
}
