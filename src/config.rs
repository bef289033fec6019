use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerManager};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides (e.g. `CIRCUIT_GUARD__DEFAULTS__TIMEOUT_MS`)
pub const ENV_PREFIX: &str = "CIRCUIT_GUARD";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Settings applied to every breaker without a preset
    #[serde(default)]
    pub defaults: BreakerSettings,

    /// Per-dependency breaker profiles
    #[serde(default)]
    pub breakers: BTreeMap<String, BreakerSettings>,
}

impl Config {
    /// Load configuration from the embedded defaults, the file at `path`
    /// (if present) and environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::from(path.as_ref()).required(false))
            // Override with environment variables (prefix: CIRCUIT_GUARD__)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Resolve the breaker configuration for a dependency.
    ///
    /// Precedence, highest first: the dependency's profile fields, its
    /// preset, the `[defaults]` section, built-in defaults.
    pub fn breaker_config(&self, name: &str) -> Result<CircuitBreakerConfig> {
        let base = self.defaults.resolve(CircuitBreakerConfig::default())?;

        match self.breakers.get(name) {
            Some(profile) => profile.resolve(base),
            None => Ok(base),
        }
    }

    /// Register a breaker for every configured profile
    pub fn register_breakers(&self, manager: &CircuitBreakerManager) -> Result<()> {
        for name in self.breakers.keys() {
            let config = self.breaker_config(name)?;
            manager.get_breaker(name.clone(), config);
        }

        tracing::info!(count = self.breakers.len(), "Registered configured circuit breakers");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Register breaker collectors with Prometheus
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

/// Named starting points for a breaker profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerPreset {
    HttpApi,
    Database,
    Notifications,
    Cache,
}

impl BreakerPreset {
    pub fn config(&self) -> CircuitBreakerConfig {
        match self {
            BreakerPreset::HttpApi => CircuitBreakerConfig::for_http_api(),
            BreakerPreset::Database => CircuitBreakerConfig::for_database(),
            BreakerPreset::Notifications => CircuitBreakerConfig::for_notifications(),
            BreakerPreset::Cache => CircuitBreakerConfig::for_cache(),
        }
    }
}

/// Partial breaker settings as they appear in configuration files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<BreakerPreset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_interval_ms: Option<u64>,
}

/// Fully specified settings describing an existing configuration
impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            preset: None,
            failure_threshold: Some(config.failure_threshold),
            success_threshold: Some(config.success_threshold),
            timeout_ms: Some(config.timeout.as_millis() as u64),
            monitor_interval_ms: Some(config.monitor_interval.as_millis() as u64),
        }
    }
}

impl BreakerSettings {
    /// Overlay these settings on `fallback` (or on the preset, when one is
    /// named) and validate the result
    pub fn resolve(&self, fallback: CircuitBreakerConfig) -> Result<CircuitBreakerConfig> {
        let base = match self.preset {
            Some(preset) => preset.config(),
            None => fallback,
        };

        let config = CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.timeout),
            monitor_interval: self
                .monitor_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(base.monitor_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
