//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Metrics configuration.
    pub metrics: MetricsConfig,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    metrics: Option<MetricsConfig>,
    logging: Option<LogConfig>,
}

impl TelemetryConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Disables metrics collection.
    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        let config = self.metrics.take().unwrap_or_default();
        self.metrics = Some(MetricsConfig {
            enabled: false,
            ..config
        });
        self
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn log_level(mut self, level: &str) -> Self {
        let config = self.logging.take().unwrap_or_default();
        self.logging = Some(LogConfig {
            level: level.to_string(),
            ..config
        });
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            metrics: self.metrics.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}
