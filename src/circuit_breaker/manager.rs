//! Keyed manager for the circuit breakers of one process.

use crate::circuit_breaker::{
    BreakerStatus, CircuitBreaker, CircuitBreakerConfig, CircuitState, ProtectedDependency,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Registry of named circuit breakers, one per dependency.
///
/// Breakers are created lazily on first lookup and stay registered for the
/// lifetime of the manager. Managers are plain values: build one per
/// application (or per test) and share it by reference or `Arc`.
#[derive(Debug, Default)]
pub struct CircuitBreakerManager {
    /// Map of circuit breaker name to instance
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
        }
    }

    /// Get the breaker registered under `name`, creating it from `config`
    /// on first use.
    ///
    /// Repeat lookups return the existing instance and ignore `config`.
    pub fn get_breaker(
        &self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        let name = name.into();

        if let Some(existing) = self.breakers.get(&name) {
            return existing.value().clone();
        }

        self.breakers
            .entry(name.clone())
            .or_insert_with(|| {
                info!(name = %name, "Registering circuit breaker");
                Arc::new(CircuitBreaker::new(name.clone(), config))
            })
            .clone()
    }

    /// Bind a dependency handle to the breaker registered under `name`
    pub fn protect<S>(
        &self,
        name: impl Into<String>,
        dependency: S,
        config: CircuitBreakerConfig,
    ) -> ProtectedDependency<S> {
        ProtectedDependency::new(dependency, self.get_breaker(name, config))
    }

    /// Get an existing circuit breaker by name
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Names of all registered breakers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Status snapshot of every registered breaker, keyed by name
    pub fn get_all_statuses(&self) -> BTreeMap<String, BreakerStatus> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status()))
            .collect()
    }

    /// Reset every registered breaker to closed state
    pub fn reset_all(&self) {
        info!(count = self.breakers.len(), "Resetting all circuit breakers");
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// Aggregate health over all registered breakers
    pub fn get_health_summary(&self) -> HealthSummary {
        let mut summary = HealthSummary {
            total_services: 0,
            healthy: 0,
            degraded: 0,
            failed: 0,
            overall_health: 100,
            timestamp: Utc::now(),
        };

        for entry in self.breakers.iter() {
            summary.total_services += 1;
            match entry.value().state() {
                CircuitState::Closed => summary.healthy += 1,
                CircuitState::HalfOpen => summary.degraded += 1,
                CircuitState::Open => summary.failed += 1,
            }
        }

        if summary.total_services > 0 {
            summary.overall_health =
                (summary.healthy as f64 / summary.total_services as f64 * 100.0).round() as u32;
        }

        summary
    }

    /// Get the total number of circuit breakers
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Check if the manager is empty
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

/// Health information across all managed breakers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_services: usize,
    /// Breakers in the closed state
    pub healthy: usize,
    /// Breakers in the half-open state
    pub degraded: usize,
    /// Breakers in the open state
    pub failed: usize,
    /// Percentage of healthy breakers, 100 when none are registered
    pub overall_health: u32,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_new() {
        let manager = CircuitBreakerManager::new();
        assert_eq!(manager.len(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_get_breaker_is_idempotent() {
        let manager = CircuitBreakerManager::new();

        let breaker1 = manager.get_breaker("test", CircuitBreakerConfig::default());
        assert_eq!(breaker1.name(), "test");
        assert_eq!(manager.len(), 1);

        let other_config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .build()
            .unwrap();
        let breaker2 = manager.get_breaker("test", other_config);
        assert!(Arc::ptr_eq(&breaker1, &breaker2));
        assert_eq!(breaker2.config().failure_threshold, 5);
        assert_eq!(manager.len(), 1);

        breaker1.force_open();
        assert_eq!(breaker2.state(), CircuitState::Open);
    }

    #[test]
    fn test_get() {
        let manager = CircuitBreakerManager::new();

        assert!(manager.get("nonexistent").is_none());

        manager.get_breaker("test", CircuitBreakerConfig::default());
        assert_eq!(manager.get("test").unwrap().name(), "test");
    }

    #[test]
    fn test_names() {
        let manager = CircuitBreakerManager::new();
        let config = CircuitBreakerConfig::default();

        manager.get_breaker("webhooks", config.clone());
        manager.get_breaker("database", config.clone());
        manager.get_breaker("search", config);

        assert_eq!(manager.names(), vec!["database", "search", "webhooks"]);
    }

    #[test]
    fn test_reset_all() {
        let manager = CircuitBreakerManager::new();

        let breaker = manager.get_breaker("test", CircuitBreakerConfig::default());
        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);

        manager.reset_all();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_get_all_statuses() {
        let manager = CircuitBreakerManager::new();
        let config = CircuitBreakerConfig::default();

        manager.get_breaker("a", config.clone());
        manager.get_breaker("b", config).force_open();

        let statuses = manager.get_all_statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["a"].state, CircuitState::Closed);
        assert_eq!(statuses["b"].state, CircuitState::Open);
        assert_eq!(statuses["b"].name, "b");
    }

    #[test]
    fn test_empty_health_summary() {
        let manager = CircuitBreakerManager::new();

        let health = manager.get_health_summary();
        assert_eq!(health.total_services, 0);
        assert_eq!(health.overall_health, 100);
    }

    #[test]
    fn test_health_summary_rounds() {
        let manager = CircuitBreakerManager::new();
        let config = CircuitBreakerConfig::default();

        manager.get_breaker("a", config.clone());
        manager.get_breaker("b", config.clone());
        manager.get_breaker("c", config).force_open();

        let health = manager.get_health_summary();
        assert_eq!(health.total_services, 3);
        assert_eq!(health.healthy, 2);
        assert_eq!(health.failed, 1);
        assert_eq!(health.overall_health, 67);
    }
}
