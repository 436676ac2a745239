//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with defaults,
//! so a file only needs the keys it changes.

use hermes_core::PublishStrategy;
use hermes_pipeline::Stage;
use hermes_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

/// Behavior pipeline section.
///
/// # Example
///
/// ```
/// use hermes_config::PipelineSection;
/// use hermes_pipeline::Stage;
///
/// let section = PipelineSection::default();
/// assert_eq!(section.behaviors, Stage::canonical());
/// assert_eq!(section.slow_request_threshold_ms, 500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Built-in behaviors to install, outermost first.
    #[serde(default = "default_behaviors")]
    pub behaviors: Vec<Stage>,

    /// Requests slower than this are logged as slow.
    #[serde(default = "default_slow_request_threshold_ms")]
    pub slow_request_threshold_ms: u64,

    /// Convert handler panics into errors.
    #[serde(default = "default_true")]
    pub catch_panics: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            behaviors: default_behaviors(),
            slow_request_threshold_ms: default_slow_request_threshold_ms(),
            catch_panics: true,
        }
    }
}

fn default_behaviors() -> Vec<Stage> {
    Stage::canonical()
}

fn default_slow_request_threshold_ms() -> u64 {
    500
}

/// Query cache section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Install the caching behavior.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTL for cacheable queries that do not set their own.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Capacity of the in-memory store.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_entries() -> usize {
    10_000
}

/// Notification publishing section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NotificationSection {
    /// How handlers of one notification are invoked.
    #[serde(default)]
    pub strategy: PublishStrategy,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Install the log subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. `info` or `hermes_pipeline=debug,info`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include the event target (module path).
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_target: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_section_default() {
        let section = PipelineSection::default();
        assert_eq!(section.behaviors.first(), Some(&Stage::ExceptionHandling));
        assert_eq!(section.behaviors.len(), 5);
        assert!(section.catch_panics);
    }

    #[test]
    fn test_pipeline_section_partial_toml() {
        let section: PipelineSection = toml::from_str(
            r#"
            behaviors = ["logging", "validation"]
            "#,
        )
        .expect("parse");

        assert_eq!(section.behaviors, vec![Stage::Logging, Stage::Validation]);
        assert_eq!(section.slow_request_threshold_ms, 500);
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let result: Result<PipelineSection, _> = toml::from_str(r#"behaviors = ["tracing"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<CacheSection, _> = toml::from_str("size = 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_notification_strategy_parses() {
        let section: NotificationSection =
            toml::from_str(r#"strategy = "concurrent""#).expect("parse");
        assert_eq!(section.strategy, PublishStrategy::Concurrent);
        assert_eq!(NotificationSection::default().strategy, PublishStrategy::Sequential);
    }

    #[test]
    fn test_logging_section_default() {
        let section = LoggingSection::default();
        assert_eq!(section.level, "info");
        assert_eq!(section.format, LogFormat::Json);
        assert!(section.include_target);
    }
}
