//! Prometheus metrics for circuit breakers.
//!
//! Collectors are process-wide and labelled by breaker name. Exposing them
//! over HTTP is left to the embedding application.

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "circuit_guard";

/// Container for all circuit breaker metrics
pub struct CircuitBreakerMetrics {
    /// Current state of circuit breakers (0=closed, 1=open, 2=half-open)
    pub state: GaugeVec,

    /// Calls admitted to the protected operation
    pub calls_total: CounterVec,

    /// Total number of successful calls
    pub successful_calls: CounterVec,

    /// Total number of failed calls, timeouts included
    pub failed_calls: CounterVec,

    /// Calls that ran past the breaker timeout
    pub timed_out_calls: CounterVec,

    /// Total number of rejected calls (when circuit is open)
    pub rejected_calls: CounterVec,

    /// Duration of calls through circuit breakers
    pub call_duration: HistogramVec,

    /// State transition events
    pub state_transitions: CounterVec,
}

impl CircuitBreakerMetrics {
    fn new() -> Self {
        Self {
            state: GaugeVec::new(
                Opts::new("circuit_breaker_state", "Current state of circuit breakers")
                    .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_state metric"),

            calls_total: CounterVec::new(
                Opts::new(
                    "circuit_breaker_calls_total",
                    "Total number of calls admitted through circuit breakers",
                )
                .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_calls_total metric"),

            successful_calls: CounterVec::new(
                Opts::new(
                    "circuit_breaker_successful_calls_total",
                    "Total number of successful calls",
                )
                .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_successful_calls_total metric"),

            failed_calls: CounterVec::new(
                Opts::new(
                    "circuit_breaker_failed_calls_total",
                    "Total number of failed calls",
                )
                .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_failed_calls_total metric"),

            timed_out_calls: CounterVec::new(
                Opts::new(
                    "circuit_breaker_timed_out_calls_total",
                    "Total number of calls abandoned on timeout",
                )
                .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_timed_out_calls_total metric"),

            rejected_calls: CounterVec::new(
                Opts::new(
                    "circuit_breaker_rejected_calls_total",
                    "Total number of rejected calls (circuit open)",
                )
                .namespace(NAMESPACE),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_rejected_calls_total metric"),

            call_duration: HistogramVec::new(
                HistogramOpts::new(
                    "circuit_breaker_call_duration_seconds",
                    "Duration of calls through circuit breakers",
                )
                .namespace(NAMESPACE)
                .buckets(vec![
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                    60.0,
                ]),
                &["name"],
            )
            .expect("Failed to create circuit_breaker_call_duration_seconds metric"),

            state_transitions: CounterVec::new(
                Opts::new(
                    "circuit_breaker_state_transitions_total",
                    "Total number of state transitions",
                )
                .namespace(NAMESPACE),
                &["name", "from_state", "to_state"],
            )
            .expect("Failed to create circuit_breaker_state_transitions_total metric"),
        }
    }
}

lazy_static! {
    /// Global circuit breaker metrics instance
    pub static ref CIRCUIT_BREAKER_METRICS: CircuitBreakerMetrics = CircuitBreakerMetrics::new();
}

/// Register the circuit breaker collectors with a Prometheus registry
pub fn init_circuit_breaker_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.state.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.calls_total.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.successful_calls.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.failed_calls.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.timed_out_calls.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.rejected_calls.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.call_duration.clone()))?;
    registry.register(Box::new(CIRCUIT_BREAKER_METRICS.state_transitions.clone()))?;

    tracing::info!("Circuit breaker metrics initialized");
    Ok(())
}
