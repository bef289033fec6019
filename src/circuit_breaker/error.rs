//! Errors originated by the circuit breaker itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Why a protected call did not execute or did not complete
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The circuit is open and the cool-down has not elapsed
    CircuitOpen,
    /// The operation exceeded the breaker's timeout
    Timeout,
}

/// Error raised by a circuit breaker, never by the wrapped operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CircuitBreakerError {
    pub message: String,
    pub code: ErrorCode,
    pub timestamp: DateTime<Utc>,
}

impl CircuitBreakerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            timestamp: Utc::now(),
        }
    }

    /// Rejection of a call while the named circuit is open
    pub fn circuit_open(name: &str, next_attempt_time: Option<DateTime<Utc>>) -> Self {
        let message = match next_attempt_time {
            Some(at) => format!(
                "Circuit breaker '{}' is open; next attempt at {}",
                name,
                at.to_rfc3339()
            ),
            None => format!("Circuit breaker '{}' is open", name),
        };
        Self::new(ErrorCode::CircuitOpen, message)
    }

    /// A call through the named breaker ran past its budget
    pub fn timeout(name: &str, timeout_ms: u128) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation through '{}' timed out after {}ms", name, timeout_ms),
        )
    }
}

/// Outcome of a failed `execute` call.
///
/// Operation errors are handed back untouched in [`ExecuteError::Operation`].
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError<E> {
    /// The breaker rejected the call or abandoned it on timeout
    #[error(transparent)]
    Breaker(#[from] CircuitBreakerError),

    /// The operation's own error
    #[error("{0}")]
    Operation(E),
}

impl<E> ExecuteError<E> {
    /// Breaker error code, if the breaker originated this error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ExecuteError::Breaker(err) => Some(err.code),
            ExecuteError::Operation(_) => None,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.code() == Some(ErrorCode::CircuitOpen)
    }

    pub fn is_timeout(&self) -> bool {
        self.code() == Some(ErrorCode::Timeout)
    }

    pub fn breaker_error(&self) -> Option<&CircuitBreakerError> {
        match self {
            ExecuteError::Breaker(err) => Some(err),
            ExecuteError::Operation(_) => None,
        }
    }

    /// Take back the operation's error, if that is what this is
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            ExecuteError::Operation(err) => Some(err),
            ExecuteError::Breaker(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::CircuitOpen.to_string(), "CIRCUIT_OPEN");
        assert_eq!(ErrorCode::Timeout.as_ref(), "TIMEOUT");
        assert_eq!(ErrorCode::from_str("CIRCUIT_OPEN").unwrap(), ErrorCode::CircuitOpen);
        assert_eq!(
            serde_json::to_string(&ErrorCode::CircuitOpen).unwrap(),
            "\"CIRCUIT_OPEN\""
        );
    }

    #[test]
    fn test_circuit_open_message() {
        let err = CircuitBreakerError::circuit_open("payments", None);
        assert_eq!(err.code, ErrorCode::CircuitOpen);
        assert_eq!(err.to_string(), "Circuit breaker 'payments' is open");
    }

    #[test]
    fn test_execute_error_passthrough() {
        let err: ExecuteError<std::io::Error> =
            ExecuteError::Operation(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.into_operation_error().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_execute_error_from_breaker() {
        let err: ExecuteError<std::io::Error> = CircuitBreakerError::timeout("svc", 200).into();
        assert!(err.is_timeout());
        assert!(!err.is_circuit_open());
        assert_eq!(err.to_string(), "Operation through 'svc' timed out after 200ms");
    }
}
