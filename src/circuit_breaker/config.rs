//! Circuit breaker configuration with builder pattern.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,

    /// Number of consecutive successes in half-open state before closing
    pub success_threshold: u32,

    /// Per-call budget; also how long an open circuit waits before probing
    pub timeout: Duration,

    /// Period of the uptime recompute
    pub monitor_interval: Duration,
}

impl CircuitBreakerConfig {
    /// Create a new builder for CircuitBreakerConfig
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(Error::InvalidConfig(
                "failure_threshold must be greater than 0".to_string(),
            ));
        }

        if self.success_threshold == 0 {
            return Err(Error::InvalidConfig(
                "success_threshold must be greater than 0".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.monitor_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "monitor_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_millis(30_000),
            monitor_interval: Duration::from_millis(60_000),
        }
    }
}

/// Builder for CircuitBreakerConfig with fluent API.
///
/// Unset fields fall back to [`CircuitBreakerConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: Option<u32>,
    success_threshold: Option<u32>,
    timeout: Option<Duration>,
    monitor_interval: Option<Duration>,
}

impl CircuitBreakerConfigBuilder {
    /// Set the failure threshold
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Set the success threshold
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Set the call timeout and open-state cool-down
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the uptime monitor period
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = Some(interval);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CircuitBreakerConfig> {
        let default = CircuitBreakerConfig::default();

        let config = CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(default.failure_threshold),
            success_threshold: self.success_threshold.unwrap_or(default.success_threshold),
            timeout: self.timeout.unwrap_or(default.timeout),
            monitor_interval: self.monitor_interval.unwrap_or(default.monitor_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Predefined configurations for common dependency kinds
impl CircuitBreakerConfig {
    /// Configuration for external HTTP APIs (moderate tolerance)
    pub fn for_http_api() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(60),
        }
    }

    /// Configuration for database operations (quick to trip, quick to probe)
    pub fn for_database() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 3,
            timeout: Duration::from_secs(10),
            monitor_interval: Duration::from_secs(30),
        }
    }

    /// Configuration for notification and webhook delivery (high tolerance)
    pub fn for_notifications() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            monitor_interval: Duration::from_secs(120),
        }
    }

    /// Configuration for cache lookups (moderate tolerance, short budget)
    pub fn for_cache() -> Self {
        Self {
            failure_threshold: 8,
            success_threshold: 3,
            timeout: Duration::from_secs(2),
            monitor_interval: Duration::from_secs(60),
        }
    }
}
