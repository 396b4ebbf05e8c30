//! Telemetry error types.

use thiserror::Error;

/// Errors raised while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The metrics recorder could not be installed.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// The log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A configuration value is invalid.
    #[error("invalid telemetry configuration: {0}")]
    InvalidConfig(String),
}
