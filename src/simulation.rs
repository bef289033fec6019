//! Synthetic load for exercising a breaker from the command line.

use crate::circuit_breaker::{
    BreakerStatus, CircuitBreakerConfig, CircuitBreakerManager, ErrorCode, ExecuteError,
    HealthSummary,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// A fake dependency that fails a fixed share of calls and answers after a
/// fixed latency
#[derive(Debug)]
pub struct SyntheticDependency {
    failure_ratio: f64,
    latency: Duration,
    calls: AtomicU64,
}

impl SyntheticDependency {
    /// `failure_ratio` is clamped to `[0, 1]`
    pub fn new(failure_ratio: f64, latency: Duration) -> Self {
        Self {
            failure_ratio: failure_ratio.clamp(0.0, 1.0),
            latency,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of times the dependency was actually reached
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Failures are spread evenly: call `i` fails when
    /// `floor((i + 1) * ratio)` steps past `floor(i * ratio)`
    pub async fn call(&self) -> Result<u64, SyntheticFailure> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let before = (index as f64 * self.failure_ratio).floor();
        let after = ((index + 1) as f64 * self.failure_ratio).floor();
        if after > before {
            Err(SyntheticFailure { call: index })
        } else {
            Ok(index)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("synthetic failure on call {call}")]
pub struct SyntheticFailure {
    pub call: u64,
}

/// Parameters of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub calls: u32,
    pub failure_ratio: f64,
    pub latency: Duration,
    /// Pause between consecutive calls
    pub spacing: Duration,
}

/// Outcome counts of a simulation run plus the resulting breaker view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub succeeded: u32,
    pub failed: u32,
    pub timed_out: u32,
    pub rejected: u32,
    pub dependency_calls: u64,
    pub status: BreakerStatus,
    pub health: HealthSummary,
}

/// Drive the breaker registered under `name` with synthetic calls
pub async fn run(
    manager: &CircuitBreakerManager,
    name: &str,
    breaker_config: CircuitBreakerConfig,
    plan: &SimulationPlan,
) -> SimulationReport {
    let dependency = manager.protect(
        name,
        SyntheticDependency::new(plan.failure_ratio, plan.latency),
        breaker_config,
    );

    let (mut succeeded, mut failed, mut timed_out, mut rejected) = (0, 0, 0, 0);
    for call in 0..plan.calls {
        let outcome = dependency.execute(|dep| dep.call()).await;
        match outcome {
            Ok(_) => succeeded += 1,
            Err(ExecuteError::Operation(_)) => failed += 1,
            Err(ExecuteError::Breaker(err)) => match err.code {
                ErrorCode::Timeout => timed_out += 1,
                ErrorCode::CircuitOpen => rejected += 1,
            },
        }
        debug!(call, state = %dependency.breaker().state(), "Simulated call finished");

        if !plan.spacing.is_zero() {
            tokio::time::sleep(plan.spacing).await;
        }
    }

    dependency.breaker().refresh_uptime();

    SimulationReport {
        succeeded,
        failed,
        timed_out,
        rejected,
        dependency_calls: dependency.inner().calls(),
        status: dependency.status(),
        health: manager.get_health_summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;

    #[tokio::test]
    async fn test_failure_ratio_is_spread_evenly() {
        let dependency = SyntheticDependency::new(0.25, Duration::ZERO);
        let mut failures = 0;
        for _ in 0..8 {
            if dependency.call().await.is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 2);
        assert_eq!(dependency.calls(), 8);
    }

    #[tokio::test]
    async fn test_run_trips_on_constant_failure() {
        let manager = CircuitBreakerManager::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .build()
            .unwrap();
        let plan = SimulationPlan {
            calls: 10,
            failure_ratio: 1.0,
            latency: Duration::ZERO,
            spacing: Duration::ZERO,
        };

        let report = run(&manager, "flaky", config, &plan).await;

        assert_eq!(report.failed, 3);
        assert_eq!(report.rejected, 7);
        assert_eq!(report.dependency_calls, 3);
        assert_eq!(report.status.state, CircuitState::Open);
        assert_eq!(report.status.stats.uptime_percent, 0.0);
        assert_eq!(report.health.failed, 1);
        assert_eq!(report.health.overall_health, 0);
    }

    #[tokio::test]
    async fn test_run_counts_timeouts() {
        let manager = CircuitBreakerManager::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(10)
            .timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        let plan = SimulationPlan {
            calls: 2,
            failure_ratio: 0.0,
            latency: Duration::from_millis(200),
            spacing: Duration::ZERO,
        };

        let report = run(&manager, "slow", config, &plan).await;

        assert_eq!(report.timed_out, 2);
        assert_eq!(report.status.stats.total_failures, 2);
        assert_eq!(report.status.state, CircuitState::Closed);
    }
}
