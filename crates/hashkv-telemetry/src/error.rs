//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the logging subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Invalid level, directive, or format.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed, or the writer failed.
    #[error("Initialization error: {0}")]
    InitError(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
