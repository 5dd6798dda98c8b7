//! Counters exposed by a circuit breaker.

use crate::circuit_breaker::state::CircuitState;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time view of the breaker's counters and state.
///
/// Always read under the breaker's lock, so the three fields belong to the
/// same moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Failures counted toward the failure threshold.
    pub failure_count: u32,
    /// Successful trial calls while half-open.
    pub success_count: u32,
    /// Current state.
    pub state: CircuitState,
}

/// Lifetime counters about circuit breaker behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Total number of calls, including rejected ones.
    pub total_calls: u64,
    /// Number of calls whose operation succeeded.
    pub successful_calls: u64,
    /// Number of calls whose operation failed.
    pub failed_calls: u64,
    /// Number of calls short-circuited by an open circuit.
    pub rejected_calls: u64,
    /// Number of times the circuit has opened.
    pub times_opened: u64,
    /// Number of times the circuit has left open or half-open for closed,
    /// including forced closes.
    pub times_closed: u64,
    /// Wall-clock time the circuit last opened.
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl BreakerStats {
    /// Creates new empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful call.
    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.successful_calls += 1;
    }

    /// Records a failed call.
    pub fn record_failure(&mut self) {
        self.total_calls += 1;
        self.failed_calls += 1;
    }

    /// Records a rejected call.
    pub fn record_rejected(&mut self) {
        self.total_calls += 1;
        self.rejected_calls += 1;
    }

    /// Records that the circuit opened.
    pub fn record_opened(&mut self) {
        self.times_opened += 1;
        self.last_opened_at = Some(Utc::now());
    }

    /// Records that the circuit closed.
    pub fn record_closed(&mut self) {
        self.times_closed += 1;
    }

    /// Returns the success rate (0.0 to 1.0) over attempted calls.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.successful_calls + self.failed_calls;
        if attempted == 0 {
            return 1.0;
        }
        self.successful_calls as f64 / attempted as f64
    }

    /// Returns the failure rate (0.0 to 1.0) over attempted calls.
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.successful_calls + self.failed_calls;
        if attempted == 0 {
            return 0.0;
        }
        self.failed_calls as f64 / attempted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let mut stats = BreakerStats::new();
        assert_eq!(stats.success_rate(), 1.0);
        assert_eq!(stats.failure_rate(), 0.0);

        stats.record_success();
        stats.record_success();
        stats.record_failure();
        stats.record_rejected();

        assert_eq!(stats.total_calls, 4);
        assert_eq!(stats.successful_calls, 2);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.rejected_calls, 1);
        assert!((stats.success_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_record_opened_stamps_time() {
        let mut stats = BreakerStats::new();
        assert!(stats.last_opened_at.is_none());
        stats.record_opened();
        assert_eq!(stats.times_opened, 1);
        assert!(stats.last_opened_at.is_some());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = MetricsSnapshot {
            failure_count: 3,
            success_count: 0,
            state: CircuitState::Open,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "failure_count": 3, "success_count": 0, "state": "Open" })
        );
    }
}
