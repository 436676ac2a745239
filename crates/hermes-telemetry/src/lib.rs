//! Observability for Hermes: structured logging and Prometheus metrics.
//!
//! - **Logging**: `tracing-subscriber` with JSON, pretty or compact output
//! - **Metrics**: counters and histograms via the `metrics` crate, rendered
//!   by an in-process Prometheus recorder
//!
//! The pipeline behaviors call the recording helpers in [`metrics`]
//! directly; installing a subscriber or recorder is the application's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .logging(LogConfig::production())
//!     .build();
//!
//! let _guard = init_telemetry(config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Keeps telemetry active for the lifetime of the application.
///
/// On drop, a final `debug` event reports that telemetry is shutting down.
#[derive(Debug)]
pub struct TelemetryGuard {
    metrics_enabled: bool,
}

impl TelemetryGuard {
    /// Returns `true` if a metrics recorder was installed.
    #[must_use]
    pub const fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(metrics_enabled = self.metrics_enabled, "Telemetry shut down");
    }
}

/// Initializes logging and metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    Ok(TelemetryGuard {
        metrics_enabled: config.metrics.enabled,
    })
}
