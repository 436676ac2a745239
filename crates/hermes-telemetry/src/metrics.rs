//! Prometheus metrics for Hermes.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_requests_total` | Counter | `request_type`, `outcome` | Dispatched requests |
//! | `hermes_request_duration_seconds` | Histogram | `request_type` | Pipeline latency |
//! | `hermes_slow_requests_total` | Counter | `request_type` | Requests over the slow threshold |
//! | `hermes_validation_failures_total` | Counter | `request_type` | Requests rejected by validation |
//! | `hermes_cache_lookups_total` | Counter | `request_type`, `result` | Cache hits and misses |
//! | `hermes_notification_failures_total` | Counter | `notification_type`, `handler` | Failed notification handlers |
//!
//! The recording helpers are no-ops until a recorder is installed, so the
//! pipeline can call them unconditionally.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::metrics::{init_metrics, record_request, render_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_request("app::GetUserQuery", "success", Duration::from_millis(4));
//! println!("{}", render_metrics().unwrap_or_default());
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names.
pub mod names {
    /// Dispatched requests by type and outcome.
    pub const REQUESTS_TOTAL: &str = "hermes_requests_total";
    /// Pipeline latency histogram.
    pub const REQUEST_DURATION_SECONDS: &str = "hermes_request_duration_seconds";
    /// Requests slower than the configured threshold.
    pub const SLOW_REQUESTS_TOTAL: &str = "hermes_slow_requests_total";
    /// Requests rejected by validation.
    pub const VALIDATION_FAILURES_TOTAL: &str = "hermes_validation_failures_total";
    /// Cache lookups by result.
    pub const CACHE_LOOKUPS_TOTAL: &str = "hermes_cache_lookups_total";
    /// Failed notification handler invocations.
    pub const NOTIFICATION_FAILURES_TOTAL: &str = "hermes_notification_failures_total";
}

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// The recorder is in-process only; metrics are read back with
/// [`render_metrics`] by whatever transport the host application exposes.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a recorder is already installed
/// or the bucket list is invalid.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(names::REQUESTS_TOTAL, "Total number of dispatched requests");
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Request pipeline duration in seconds"
    );
    describe_counter!(
        names::SLOW_REQUESTS_TOTAL,
        "Requests that exceeded the slow-request threshold"
    );
    describe_counter!(
        names::VALIDATION_FAILURES_TOTAL,
        "Requests rejected by validation"
    );
    describe_counter!(names::CACHE_LOOKUPS_TOTAL, "Cache lookups by result");
    describe_counter!(
        names::NOTIFICATION_FAILURES_TOTAL,
        "Failed notification handler invocations"
    );
}

/// Records a completed request.
///
/// `outcome` is one of `success`, `validation`, `cancelled` or `fault`.
pub fn record_request(request_type: &str, outcome: &'static str, duration: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "request_type" => request_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "request_type" => request_type.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a request that exceeded the slow-request threshold.
pub fn record_slow_request(request_type: &str) {
    counter!(
        names::SLOW_REQUESTS_TOTAL,
        "request_type" => request_type.to_string()
    )
    .increment(1);
}

/// Records a validation rejection.
pub fn record_validation_failure(request_type: &str) {
    counter!(
        names::VALIDATION_FAILURES_TOTAL,
        "request_type" => request_type.to_string()
    )
    .increment(1);
}

/// Records a cache lookup.
pub fn record_cache_lookup(request_type: &str, hit: bool) {
    counter!(
        names::CACHE_LOOKUPS_TOTAL,
        "request_type" => request_type.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// Records a failed notification handler.
pub fn record_notification_failure(notification_type: &str, handler: &str) {
    counter!(
        names::NOTIFICATION_FAILURES_TOTAL,
        "notification_type" => notification_type.to_string(),
        "handler" => handler.to_string()
    )
    .increment(1);
}
