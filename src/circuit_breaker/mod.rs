//! Circuit breakers for calls to unreliable dependencies.
//!
//! This module provides:
//! - A three-state breaker ([`CircuitBreaker`]) with a per-call timeout
//! - Rolling statistics and a bounded transition history per breaker
//! - A keyed [`CircuitBreakerManager`] with aggregate health reporting
//! - Prometheus collectors for calls, rejections and transitions
//!
//! # Circuit Breaker States
//!
//! - **Closed**: Normal operation, requests pass through, failures are counted
//! - **Open**: Fast-fail mode, requests are rejected until the cool-down elapses
//! - **Half-Open**: Probing recovery; one failure reopens, enough successes close
//!
//! # Example
//!
//! ```no_run
//! use circuit_guard::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerManager};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = CircuitBreakerManager::new();
//!     let config = CircuitBreakerConfig::builder()
//!         .failure_threshold(5)
//!         .timeout(Duration::from_secs(10))
//!         .build()?;
//!
//!     let breaker = manager.get_breaker("billing-api", config);
//!
//!     let result = breaker
//!         .execute(|| async { Ok::<_, std::io::Error>(42) })
//!         .await;
//!
//!     println!("{:?}", result);
//!     println!("{:?}", manager.get_health_summary());
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod manager;
mod metrics;
mod state;
mod wrappers;

pub use self::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use self::core::{BreakerStatus, CircuitBreaker};
pub use self::error::{CircuitBreakerError, ErrorCode, ExecuteError};
pub use self::manager::{CircuitBreakerManager, HealthSummary};
pub use self::metrics::{init_circuit_breaker_metrics, CircuitBreakerMetrics, CIRCUIT_BREAKER_METRICS};
pub use self::state::{
    BreakerStats, CircuitState, StateData, StateTransition, TransitionHistory, HISTORY_CAPACITY,
};
pub use self::wrappers::ProtectedDependency;

use crate::error::Error;

impl From<CircuitBreakerError> for Error {
    fn from(err: CircuitBreakerError) -> Self {
        match err.code {
            ErrorCode::CircuitOpen => Error::Unavailable(err.message),
            ErrorCode::Timeout => Error::Timeout(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_error_conversion() {
        let err = CircuitBreakerError::circuit_open("test-service", None);
        let crate_err: Error = err.into();
        assert!(matches!(crate_err, Error::Unavailable(_)));
        assert_eq!(crate_err.error_code(), "SERVICE_UNAVAILABLE");
    }
}
