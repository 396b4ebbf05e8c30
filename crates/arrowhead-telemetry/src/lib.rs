//! Logging and metrics for Arrowhead services.
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, JSON or pretty
//! - **Metrics**: request metrics through the `metrics` facade, rendered by
//!   a Prometheus recorder
//!
//! # Example
//!
//! ```rust,no_run
//! use arrowhead_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let telemetry = init_telemetry(&TelemetryConfig::default()).unwrap();
//! if let Some(metrics) = telemetry.metrics() {
//!     println!("{}", metrics.render());
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/arrowhead-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

use serde::Deserialize;

pub use crate::error::TelemetryError;
pub use crate::logging::{init_logging, LogConfig};
pub use crate::metrics::{init_metrics, InFlightGuard, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Installed telemetry.
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Option<MetricsRegistry>,
}

impl Telemetry {
    /// Returns the metrics registry, if a recorder was installed.
    #[must_use]
    pub const fn metrics(&self) -> Option<&MetricsRegistry> {
        self.metrics.as_ref()
    }
}

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first [`TelemetryError`] raised by either subsystem.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<Telemetry> {
    init_logging(&config.logging)?;
    let metrics = init_metrics(&config.metrics)?;
    Ok(Telemetry { metrics })
}
