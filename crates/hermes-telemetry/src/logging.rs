//! Structured logging for Hermes.
//!
//! Every dispatch is logged through `tracing` events carrying `request_id`,
//! `request_type` and `handler` fields. This module installs the subscriber
//! that turns those events into JSON, pretty or compact lines.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! tracing::info!(request_type = "app::GetUserQuery", "Handled request");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable output.
    Pretty,
    /// Single-line, human-readable output.
    Compact,
}

impl LogFormat {
    /// Returns the configuration name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(TelemetryError::InvalidConfig(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `info` or `hermes=debug,warn`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Initializes the global logging subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);

    let fmt_layer = match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_production_config() {
        let config = LogConfig::production();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.span_events);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>().ok(), Some(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"pretty\"").expect("deserialize");
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("hermes=debug,warn").is_ok());
        assert!(create_env_filter("hermes=notalevel").is_err());
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
