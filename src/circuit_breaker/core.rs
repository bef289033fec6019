//! Core circuit breaker implementation with async support.

use crate::circuit_breaker::metrics::CIRCUIT_BREAKER_METRICS;
use crate::circuit_breaker::{
    BreakerStats, CircuitBreakerConfig, CircuitBreakerError, CircuitState, ExecuteError,
    StateData, StateTransition,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A thread-safe, async circuit breaker guarding one dependency.
///
/// All mutable state sits behind a single mutex that is never held across
/// an `.await`, so admission and outcome bookkeeping for one call are each
/// atomic with respect to concurrent callers.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Unique name for this circuit breaker
    name: String,
    /// Configuration
    config: CircuitBreakerConfig,
    /// Internal state
    state: Arc<Mutex<StateData>>,
    /// Background uptime recompute, when started inside a tokio runtime
    monitor: Option<JoinHandle<()>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    ///
    /// When called from within a tokio runtime this also starts the
    /// periodic uptime recompute; otherwise uptime is only refreshed by
    /// [`CircuitBreaker::refresh_uptime`].
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            name = %name,
            config = ?config,
            "Creating new circuit breaker"
        );

        let state = Arc::new(Mutex::new(StateData::new()));
        let monitor = spawn_uptime_monitor(&name, Arc::downgrade(&state), config.monitor_interval);

        CIRCUIT_BREAKER_METRICS
            .state
            .with_label_values(&[&name])
            .set(CircuitState::Closed.to_metric_value());

        Self {
            name,
            config,
            state,
            monitor,
        }
    }

    /// Get the name of this circuit breaker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Get the current configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.state.lock().success_count
    }

    /// Snapshot of the lifetime statistics
    pub fn stats(&self) -> BreakerStats {
        self.state.lock().stats.clone()
    }

    /// Execute an async operation protected by the circuit breaker.
    ///
    /// The operation is not invoked while the circuit is open and its
    /// cool-down has not elapsed. Otherwise it races the configured
    /// timeout; if the timer wins the operation's future is dropped and the
    /// call counts as a single failure. Errors from the operation are
    /// returned unchanged in [`ExecuteError::Operation`].
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, ExecuteError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit()?;

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.timeout, operation()).await;
        let elapsed = start.elapsed();

        CIRCUIT_BREAKER_METRICS
            .call_duration
            .with_label_values(&[&self.name])
            .observe(elapsed.as_secs_f64());

        match outcome {
            Ok(Ok(value)) => {
                self.on_success(elapsed.as_secs_f64() * 1000.0);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.on_failure();
                Err(ExecuteError::Operation(err))
            }
            Err(_) => {
                CIRCUIT_BREAKER_METRICS
                    .timed_out_calls
                    .with_label_values(&[&self.name])
                    .inc();
                warn!(
                    name = %self.name,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Operation timed out"
                );
                self.on_failure();
                Err(CircuitBreakerError::timeout(&self.name, self.config.timeout.as_millis()).into())
            }
        }
    }

    /// Execute an async operation, falling back when the circuit is open.
    ///
    /// Only a `CIRCUIT_OPEN` rejection triggers the fallback; timeouts and
    /// operation errors are returned as from [`CircuitBreaker::execute`].
    pub async fn execute_with_fallback<F, Fut, FB, FutB, T, E>(
        &self,
        operation: F,
        fallback: FB,
    ) -> Result<T, ExecuteError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FutB,
        FutB: Future<Output = T>,
    {
        match self.execute(operation).await {
            Err(err) if err.is_circuit_open() => {
                debug!(
                    name = %self.name,
                    "Circuit breaker open, using fallback"
                );
                Ok(fallback().await)
            }
            other => other,
        }
    }

    /// Decide whether a call may proceed, moving Open to HalfOpen once the
    /// cool-down has elapsed
    fn admit(&self) -> Result<(), CircuitBreakerError> {
        let now = Utc::now();
        let mut state = self.state.lock();

        if state.state == CircuitState::Open {
            if !state.should_attempt_reset(now) {
                state.stats.total_rejections += 1;
                CIRCUIT_BREAKER_METRICS
                    .rejected_calls
                    .with_label_values(&[&self.name])
                    .inc();
                warn!(
                    name = %self.name,
                    next_attempt_time = ?state.next_attempt_time,
                    "Rejecting call, circuit open"
                );
                return Err(CircuitBreakerError::circuit_open(
                    &self.name,
                    state.next_attempt_time,
                ));
            }

            let transition = state.transition_to(CircuitState::HalfOpen, now);
            self.log_transition(&transition);
        }

        state.stats.total_requests += 1;
        CIRCUIT_BREAKER_METRICS
            .calls_total
            .with_label_values(&[&self.name])
            .inc();

        Ok(())
    }

    /// Handle successful operation
    fn on_success(&self, response_time_ms: f64) {
        let mut state = self.state.lock();
        state.record_success(response_time_ms);

        CIRCUIT_BREAKER_METRICS
            .successful_calls
            .with_label_values(&[&self.name])
            .inc();

        debug!(
            name = %self.name,
            current_state = %state.state,
            success_count = state.success_count,
            response_time_ms,
            "Operation succeeded"
        );

        if state.state == CircuitState::HalfOpen
            && state.success_count >= self.config.success_threshold
        {
            let transition = state.transition_to(CircuitState::Closed, Utc::now());
            self.log_transition(&transition);
        }
    }

    /// Handle failed operation
    fn on_failure(&self) {
        let now = Utc::now();
        let mut state = self.state.lock();
        state.record_failure(now);

        CIRCUIT_BREAKER_METRICS
            .failed_calls
            .with_label_values(&[&self.name])
            .inc();

        warn!(
            name = %self.name,
            current_state = %state.state,
            failure_count = state.failure_count,
            "Operation failed"
        );

        let should_open = match state.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if should_open {
            let transition = state.trip(self.config.timeout, now);
            self.log_transition(&transition);
        }
    }

    /// Log and record state transition
    fn log_transition(&self, transition: &StateTransition) {
        info!(
            name = %self.name,
            from = %transition.from,
            to = %transition.to,
            reason = %transition.reason,
            "Circuit breaker state transition"
        );

        CIRCUIT_BREAKER_METRICS
            .state
            .with_label_values(&[&self.name])
            .set(transition.to.to_metric_value());

        CIRCUIT_BREAKER_METRICS
            .state_transitions
            .with_label_values(&[
                &self.name,
                &transition.from.to_string(),
                &transition.to.to_string(),
            ])
            .inc();
    }

    /// Read-only snapshot for observability
    pub fn status(&self) -> BreakerStatus {
        let state = self.state.lock();
        BreakerStatus {
            name: self.name.clone(),
            state: state.state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            last_failure_time: state.last_failure_time,
            next_attempt_time: state.next_attempt_time,
            stats: state.stats.clone(),
        }
    }

    /// Whether a call made now would reach the dependency
    pub fn is_service_available(&self) -> bool {
        self.state.lock().is_available(Utc::now())
    }

    /// Recompute the uptime percentage from the lifetime counters
    pub fn refresh_uptime(&self) {
        self.state.lock().stats.refresh_uptime();
    }

    /// Manually reset the circuit breaker to closed state.
    ///
    /// Transient counters are cleared; lifetime statistics are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if let Some(transition) = state.reset(Utc::now()) {
            self.log_transition(&transition);
        }
        info!(name = %self.name, "Circuit breaker reset");
    }

    /// Reset to closed state and also discard lifetime statistics
    pub fn hard_reset(&self) {
        let mut state = self.state.lock();
        if let Some(transition) = state.reset(Utc::now()) {
            self.log_transition(&transition);
        }
        state.stats = BreakerStats::new();
        info!(name = %self.name, "Circuit breaker hard reset");
    }

    /// Force the circuit breaker to open state for one cool-down period
    pub fn force_open(&self) {
        let mut state = self.state.lock();
        if state.state != CircuitState::Open {
            let transition = state.trip(self.config.timeout, Utc::now());
            self.log_transition(&transition);
        }
    }
}

impl Drop for CircuitBreaker {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
    }
}

fn spawn_uptime_monitor(
    name: &str,
    state: Weak<Mutex<StateData>>,
    period: Duration,
) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    let name = name.to_string();

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(shared) = state.upgrade() else {
                break;
            };
            let uptime = {
                let mut state = shared.lock();
                state.stats.refresh_uptime();
                state.stats.uptime_percent
            };
            debug!(name = %name, uptime_percent = uptime, "Uptime recomputed");
        }
    }))
}

/// Point-in-time view of a circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub next_attempt_time: Option<DateTime<Utc>>,
    pub stats: BreakerStats,
}
