//! Circuit breaker for async operations.

use crate::circuit_breaker::breaker::{admit_call, log_transition, record_result, DEFAULT_NAME};
use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::metrics::{BreakerStats, MetricsSnapshot};
use crate::circuit_breaker::state::{BreakerState, CircuitState};
use crate::core::{ArcClock, BreakerResult, Outcome, SystemClock};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A circuit breaker whose protected operation is a future.
///
/// Behaves exactly like [`CircuitBreaker`](super::CircuitBreaker), but the
/// lock is a `tokio` mutex held across the operation's `.await`, so waiting
/// callers yield to the runtime instead of blocking a worker thread.
///
/// # Example
///
/// ```rust,ignore
/// use tripwire::{AsyncCircuitBreaker, CircuitBreakerConfig};
///
/// let breaker = AsyncCircuitBreaker::new(CircuitBreakerConfig::default())?;
/// let outcome = breaker.execute(|| async { client.get(url).send().await }).await;
/// ```
pub struct AsyncCircuitBreaker {
    name: String,
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
    clock: ArcClock,
}

impl AsyncCircuitBreaker {
    /// Creates a new async circuit breaker backed by the system clock.
    pub fn new(config: CircuitBreakerConfig) -> BreakerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new async circuit breaker that reads time from `clock`.
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

    /// Runs the future produced by `operation` through the breaker.
    ///
    /// `operation` is only called when the circuit admits the call.
    pub async fn execute<R, E, F, Fut>(&self, operation: F) -> Outcome<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: fmt::Debug,
    {
        let mut state = self.state.lock().await;
        if let Some(fallback) = admit_call(&mut state, self.clock.now(), &self.config, &self.name) {
            return Outcome::Degraded(fallback);
        }

        let result = operation().await;
        record_result(&mut state, result, &*self.clock, &self.config, &self.name)
    }

    /// Returns a consistent snapshot of the counters and state.
    pub async fn metrics(&self) -> MetricsSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Returns the current state.
    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state()
    }

    /// Returns a copy of the lifetime counters.
    pub async fn stats(&self) -> BreakerStats {
        self.state.lock().await.stats().clone()
    }

    /// Forces the circuit into the open state.
    pub async fn force_open(&self) {
        let mut state = self.state.lock().await;
        if let Some(transition) = state.force_open(self.clock.now()) {
            log_transition(&self.name, transition, &state);
        }
    }

    /// Forces the circuit into the closed state.
    pub async fn force_close(&self) {
        let mut state = self.state.lock().await;
        if let Some(transition) = state.force_close() {
            log_transition(&self.name, transition, &state);
        }
    }

    /// Resets the circuit breaker state and counters.
    pub async fn reset(&self) {
        self.state.lock().await.reset();
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }

}

impl fmt::Debug for AsyncCircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("AsyncCircuitBreaker");
        debug.field("name", &self.name);
        if let Ok(state) = self.state.try_lock() {
            debug.field("state", &*state);
        } else {
            debug.field("state", &"<locked>");
        }
        debug.field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FallbackCause, ManualClock};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn breaker(clock: &ManualClock) -> AsyncCircuitBreaker {
        let config = CircuitBreakerConfig::new(2, Duration::from_millis(50), 1);
        AsyncCircuitBreaker::with_clock(config, Arc::new(clock.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_async_success_passes_through() {
        let breaker = breaker(&ManualClock::new());
        let outcome = breaker
            .execute(|| async { Ok::<_, String>(42) })
            .await;

        assert_eq!(outcome, Outcome::Success(42));
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_async_open_does_not_poll_operation() {
        let clock = ManualClock::new();
        let breaker = breaker(&clock);
        for _ in 0..2 {
            breaker
                .execute(|| async { Err::<(), _>("down") })
                .await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let outcome = breaker
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        assert_eq!(outcome.cause(), Some(FallbackCause::CircuitOpen));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_recovers_after_retry_timeout() {
        let clock = ManualClock::new();
        let breaker = breaker(&clock);
        breaker.force_open().await;

        clock.advance(Duration::from_millis(50));
        let outcome = breaker
            .execute(|| async { Ok::<_, String>("ok") })
            .await;

        assert!(outcome.is_success());
        assert_eq!(breaker.metrics().await, MetricsSnapshot::default());
        assert_eq!(breaker.stats().await.times_closed, 1);
    }

    #[tokio::test]
    async fn test_async_with_real_clock() {
        let config = CircuitBreakerConfig::new(1, Duration::from_millis(10), 1);
        let breaker = AsyncCircuitBreaker::new(config).unwrap().with_name("real");

        breaker
            .execute(|| async { Err::<(), _>("down") })
            .await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let outcome = breaker
            .execute(|| async { Ok::<_, String>(()) })
            .await;
        assert!(outcome.is_success());
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_async_reset() {
        let breaker = breaker(&ManualClock::new());
        breaker.force_open().await;
        breaker.reset().await;
        assert_eq!(breaker.metrics().await, MetricsSnapshot::default());
        assert!(format!("{:?}", breaker).contains("AsyncCircuitBreaker"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_async_callers_never_overlap() {
        let config = CircuitBreakerConfig::new(3, Duration::ZERO, 2);
        let breaker = Arc::new(AsyncCircuitBreaker::new(config).unwrap());
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_in_flight = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8u32)
            .map(|task| {
                let breaker = Arc::clone(&breaker);
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                tokio::spawn(async move {
                    for call in 0..10u32 {
                        let in_flight = Arc::clone(&in_flight);
                        let max_in_flight = Arc::clone(&max_in_flight);
                        breaker
                            .execute(move || async move {
                                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                                max_in_flight.fetch_max(now, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(1)).await;
                                in_flight.fetch_sub(1, Ordering::SeqCst);
                                if (task + call) % 3 == 0 {
                                    Err("flaky")
                                } else {
                                    Ok(())
                                }
                            })
                            .await;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        let stats = breaker.stats().await;
        assert_eq!(stats.total_calls, 80);
        assert_eq!(stats.successful_calls + stats.failed_calls, 80);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_async_single_trial_call_per_open_window() {
        let clock = ManualClock::new();
        let config = CircuitBreakerConfig::new(1, Duration::from_secs(5), 1);
        let breaker =
            Arc::new(AsyncCircuitBreaker::with_clock(config, Arc::new(clock.clone())).unwrap());

        breaker
            .execute(|| async { Err::<(), _>("down") })
            .await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        clock.advance(Duration::from_secs(5));

        let attempts = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let breaker = Arc::clone(&breaker);
                let attempts = Arc::clone(&attempts);
                tokio::spawn(async move {
                    breaker
                        .execute(move || async move {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            Err::<(), _>("still down")
                        })
                        .await
                })
            })
            .collect();

        let mut rejected = 0;
        for handle in handles {
            if handle.await.unwrap().cause() == Some(FallbackCause::CircuitOpen) {
                rejected += 1;
            }
        }

        // The trial call reopens the circuit and the clock does not move, so
        // every other caller is short-circuited.
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(rejected, 7);
        assert_eq!(breaker.state().await, CircuitState::Open);
    }
}
