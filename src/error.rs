use thiserror::Error;

/// Crate-level error type for configuration, validation and metrics setup.
///
/// Errors from protected calls are reported through
/// [`crate::circuit_breaker::ExecuteError`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid breaker settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A dependency is behind an open circuit
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Metrics(_) => "METRICS_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Error::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

/// Conversion from prometheus::Error
impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Conversion from toml::ser::Error
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::InvalidConfig("test".to_string()).error_code(),
            "INVALID_CONFIG"
        );
        assert_eq!(Error::Timeout("test".to_string()).error_code(), "TIMEOUT");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = config::ConfigError::Message("missing key".to_string()).into();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: missing key");
    }
}
