//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct, its builder,
//! and the conversions into the settings the pipeline and telemetry crates
//! consume.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::{CacheSection, ConfigError, LoggingSection, NotificationSection, PipelineSection};
use hermes_pipeline::PipelineSettings;
use hermes_telemetry::logging::create_env_filter;
use hermes_telemetry::{LogConfig, TelemetryConfig};

/// Complete mediator configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.cache.default_ttl_secs, 300);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Behavior pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Query cache configuration.
    #[serde(default)]
    pub cache: CacheSection,

    /// Notification publishing configuration.
    #[serde(default)]
    pub notifications: NotificationSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The behavior list is empty or names a stage twice
    /// - The slow-request threshold, default TTL or cache capacity is zero
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.behaviors.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.behaviors",
                "at least one behavior is required",
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.pipeline.behaviors.iter().find(|s| !seen.insert(**s)) {
            return Err(ConfigError::invalid_value(
                "pipeline.behaviors",
                format!("'{duplicate}' is listed more than once"),
            ));
        }

        if self.pipeline.slow_request_threshold_ms == 0 {
            return Err(ConfigError::invalid_value(
                "pipeline.slow_request_threshold_ms",
                "must be greater than zero",
            ));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "cache.default_ttl_secs",
                "must be greater than zero",
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid_value(
                "cache.max_entries",
                "must be greater than zero",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        create_env_filter(&self.logging.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty, debug-level logs
    /// - Panics propagate instead of being converted
    /// - Lower slow-request threshold
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = hermes_telemetry::LogFormat::Pretty;
        config.pipeline.catch_panics = false;
        config.pipeline.slow_request_threshold_ms = 200;

        config
    }

    /// Create a production configuration preset.
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    /// use hermes_telemetry::LogFormat;
    ///
    /// let config = HermesConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = hermes_telemetry::LogFormat::Json;
        config.pipeline.catch_panics = true;

        config
    }

    /// Settings for the built-in pipeline behaviors.
    #[must_use]
    pub fn to_pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            slow_request_threshold: Duration::from_millis(self.pipeline.slow_request_threshold_ms),
            catch_panics: self.pipeline.catch_panics,
            cache_enabled: self.cache.enabled,
            default_cache_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            max_cache_entries: self.cache.max_entries,
        }
    }

    /// Logging configuration for `hermes_telemetry::init_logging`.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            format: self.logging.format,
            include_target: self.logging.include_target,
            ..LogConfig::default()
        }
    }

    /// Telemetry configuration with this file's logging section.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::builder().logging(self.to_log_config()).build()
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    pipeline: Option<PipelineSection>,
    cache: Option<CacheSection>,
    notifications: Option<NotificationSection>,
    logging: Option<LoggingSection>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineSection) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the cache configuration.
    #[must_use]
    pub fn cache(mut self, cache: CacheSection) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the notification configuration.
    #[must_use]
    pub fn notifications(mut self, notifications: NotificationSection) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            pipeline: self.pipeline.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
            notifications: self.notifications.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
