//! Process-local circuit breakers for calls to unreliable dependencies.
//!
//! See [`circuit_breaker`] for the breaker and its manager, [`config`] for
//! loading per-dependency settings.

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod simulation;

pub use circuit_breaker::{
    BreakerStatus, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError,
    CircuitBreakerManager, CircuitState, ErrorCode, ExecuteError, HealthSummary,
};
pub use error::{Error, Result};
