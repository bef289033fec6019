//! Circuit breaker state machine implementation.
//!
//! This module holds the per-breaker mutable data (state, consecutive
//! counters, lifetime statistics) and the transition rules that act on it.
//! Callers are expected to hold the breaker's lock while mutating a
//! [`StateData`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Maximum number of transitions kept in a breaker's history
pub const HISTORY_CAPACITY: usize = 50;

/// The current state of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed - requests are allowed through, failures are counted
    Closed,
    /// Circuit is open - requests are rejected until the cool-down elapses
    Open,
    /// Circuit is half-open - probing whether the dependency recovered
    HalfOpen,
}

impl CircuitState {
    /// Convert state to numeric value for Prometheus gauge
    pub fn to_metric_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Represents a state transition in the circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state
    pub from: CircuitState,
    /// New state
    pub to: CircuitState,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition
    pub reason: String,
}

impl StateTransition {
    /// Create a new state transition stamped with the given time
    pub fn new(
        from: CircuitState,
        to: CircuitState,
        reason: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            timestamp,
            reason,
        }
    }
}

/// Fixed-capacity ring of the most recent state transitions.
///
/// Once [`HISTORY_CAPACITY`] entries are stored, each new entry evicts the
/// oldest one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionHistory {
    entries: VecDeque<StateTransition>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a transition, dropping the oldest entry when full
    pub fn push(&mut self, transition: StateTransition) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first iterator over the stored transitions
    pub fn iter(&self) -> impl Iterator<Item = &StateTransition> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&StateTransition> {
        self.entries.back()
    }
}

/// Lifetime statistics of a circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Calls admitted to the operation (rejections excluded)
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    /// Calls rejected while the circuit was open
    pub total_rejections: u64,
    /// Exponentially smoothed response time of successful calls
    pub avg_response_time_ms: f64,
    /// Successful share of all admitted calls, refreshed periodically
    pub uptime_percent: f64,
    pub state_change_history: TransitionHistory,
    pub last_state_change_at: Option<DateTime<Utc>>,
}

impl BreakerStats {
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
            total_rejections: 0,
            avg_response_time_ms: 0.0,
            uptime_percent: 100.0,
            state_change_history: TransitionHistory::new(),
            last_state_change_at: None,
        }
    }

    /// Fold a successful call's response time into the moving average
    pub fn record_response_time(&mut self, response_time_ms: f64) {
        self.avg_response_time_ms = if self.avg_response_time_ms == 0.0 {
            response_time_ms
        } else {
            0.1 * response_time_ms + 0.9 * self.avg_response_time_ms
        };
    }

    /// Recompute `uptime_percent`, rounded to two decimals
    pub fn refresh_uptime(&mut self) {
        self.uptime_percent = if self.total_requests == 0 {
            100.0
        } else {
            let ratio = self.total_successes as f64 / self.total_requests as f64;
            ((ratio * 100.0 * 100.0).round() / 100.0).clamp(0.0, 100.0)
        };
    }
}

impl Default for BreakerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal state data for the circuit breaker
#[derive(Debug, Clone)]
pub struct StateData {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures; zeroed by any success
    pub failure_count: u32,
    /// Consecutive successes; zeroed by any failure
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Earliest time an open circuit admits a probe
    pub next_attempt_time: Option<DateTime<Utc>>,
    pub stats: BreakerStats,
}

impl StateData {
    /// Create new state data in Closed state
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
            stats: BreakerStats::new(),
        }
    }

    /// Record a successful request
    pub fn record_success(&mut self, response_time_ms: f64) {
        self.stats.total_successes += 1;
        self.failure_count = 0;
        self.success_count += 1;
        self.stats.record_response_time(response_time_ms);
    }

    /// Record a failed request
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.stats.total_failures += 1;
        self.success_count = 0;
        self.failure_count += 1;
        self.last_failure_time = Some(now);
    }

    /// Transition to a new state and append it to the history
    pub fn transition_to(&mut self, new_state: CircuitState, now: DateTime<Utc>) -> StateTransition {
        let transition = StateTransition::new(
            self.state,
            new_state,
            self.transition_reason(new_state),
            now,
        );

        self.state = new_state;
        self.stats.last_state_change_at = Some(now);
        self.stats.state_change_history.push(transition.clone());

        match new_state {
            CircuitState::Closed => {
                self.success_count = 0;
                self.next_attempt_time = None;
            }
            CircuitState::HalfOpen => {}
            CircuitState::Open => {}
        }

        transition
    }

    /// Open the circuit and schedule the next probe `cool_down` from `now`
    pub fn trip(&mut self, cool_down: Duration, now: DateTime<Utc>) -> StateTransition {
        let transition = self.transition_to(CircuitState::Open, now);
        let delta = chrono::Duration::milliseconds(cool_down.as_millis() as i64);
        self.next_attempt_time = Some(
            now.checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        transition
    }

    /// Get a human-readable reason for the state transition
    fn transition_reason(&self, new_state: CircuitState) -> String {
        match (self.state, new_state) {
            (CircuitState::Closed, CircuitState::Open) => {
                format!("Failure threshold reached ({} consecutive failures)", self.failure_count)
            }
            (CircuitState::Open, CircuitState::HalfOpen) => {
                "Cool-down elapsed, probing recovery".to_string()
            }
            (CircuitState::HalfOpen, CircuitState::Closed) => {
                format!("Recovery confirmed ({} consecutive successes)", self.success_count)
            }
            (CircuitState::HalfOpen, CircuitState::Open) => "Recovery probe failed".to_string(),
            _ => format!("Transitioned from {} to {}", self.state, new_state),
        }
    }

    /// Check if an open circuit may admit a probe at `now`
    pub fn should_attempt_reset(&self, now: DateTime<Utc>) -> bool {
        if self.state != CircuitState::Open {
            return false;
        }

        match self.next_attempt_time {
            Some(next_attempt) => now >= next_attempt,
            None => true,
        }
    }

    /// Whether a call arriving at `now` would be let through
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.state != CircuitState::Open || self.should_attempt_reset(now)
    }

    /// Drop back to Closed with cleared transient counters; stats survive
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<StateTransition> {
        let transition = if self.state != CircuitState::Closed {
            Some(self.transition_to(CircuitState::Closed, now))
        } else {
            None
        };

        self.failure_count = 0;
        self.success_count = 0;
        self.last_failure_time = None;
        self.next_attempt_time = None;

        transition
    }
}

impl Default for StateData {
    fn default() -> Self {
        Self::new()
    }
}
