//! Request metrics for Arrowhead services.
//!
//! Metrics are recorded through the `metrics` facade, so recording is a
//! no-op until a recorder is installed. [`init_metrics`] installs a
//! Prometheus recorder whose [`MetricsRegistry`] renders the text
//! exposition format.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `arrowhead_requests_total` | Counter | `service`, `status` | Exchanges answered |
//! | `arrowhead_request_duration_seconds` | Histogram | `service` | Time to the response |
//! | `arrowhead_unhandled_failures_total` | Counter | `service` | Failures no catcher handled |
//! | `arrowhead_in_flight_requests` | Gauge | - | Exchanges awaiting a response |
//!
//! Requests that match no service are labelled with [`UNROUTED`].

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of answered exchanges.
pub const REQUESTS_TOTAL: &str = "arrowhead_requests_total";

/// Histogram of the time from request head to response.
pub const REQUEST_DURATION_SECONDS: &str = "arrowhead_request_duration_seconds";

/// Counter of failures that reached the engine's fallback.
pub const UNHANDLED_FAILURES_TOTAL: &str = "arrowhead_unhandled_failures_total";

/// Gauge of exchanges awaiting a response.
pub const IN_FLIGHT_REQUESTS: &str = "arrowhead_in_flight_requests";

/// Service label for requests no service is mounted for.
pub const UNROUTED: &str = "unrouted";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to install a recorder.
    pub enabled: bool,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms to 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Renders the metrics of an installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Wraps a recorder handle.
    #[must_use]
    pub const fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all metrics in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder.
///
/// Returns `None` when metrics are disabled.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfig`] for unusable buckets and
/// [`TelemetryError::MetricsInit`] if a global recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<Option<MetricsRegistry>> {
    if !config.enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe_metrics();
    Ok(Some(MetricsRegistry::new(handle)))
}

/// Registers the descriptions of the framework metrics.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of exchanges answered");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from request head to response"
    );
    describe_counter!(
        UNHANDLED_FAILURES_TOTAL,
        "Failures no catcher handled, answered by the engine fallback"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Exchanges awaiting a response");
}

/// Records an answered exchange.
pub fn record_request(service: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "service" => service.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "service" => service.to_string())
        .record(duration.as_secs_f64());
}

/// Records a failure answered by the engine fallback.
pub fn record_unhandled_failure(service: &str) {
    counter!(UNHANDLED_FAILURES_TOTAL, "service" => service.to_string()).increment(1);
}

/// Counts an exchange as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
