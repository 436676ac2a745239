//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, strings, `.env` files and environment
//! variables.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, HermesConfig};
use hermes_core::PublishStrategy;
use hermes_pipeline::Stage;
use hermes_telemetry::LogFormat;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "HERMES";

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration files and strings (TOML or JSON), in call order
/// 3. `.env` file entries
/// 4. Process environment variables
///
/// File and string layers are merged key by key, so a layer only replaces the
/// values it actually sets. The result is validated by [`ConfigLoader::load`].
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("hermes.toml")?
///     .with_env_prefix("HERMES")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    dotenv: BTreeMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HermesConfig::default(),
            env_prefix: None,
            dotenv: BTreeMap::new(),
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = HermesConfig::default();
        self
    }

    /// Start with development preset configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, &format)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// `format` is `"toml"` or `"json"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the merged result does not
    /// fit the schema.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [cache]
    ///     default_ttl_secs = 60
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.cache.default_ttl_secs, 60);
    /// assert_eq!(config.cache.max_entries, 10_000);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, for example
    /// `HERMES__CACHE__DEFAULT_TTL_SECS=60`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read `.env` from the current directory, if present.
    ///
    /// Entries are applied as overrides before the process environment, and
    /// are not exported to it. Without [`with_env_prefix`](Self::with_env_prefix)
    /// only `HERMES__` entries are read.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => self.collect_dotenv(iter),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path.as_ref())?;
        self.collect_dotenv(iter)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies `.env` entries, then environment variable overrides (only if
    /// a prefix was set), and validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        let prefix = self.env_prefix.take();
        let dotenv_prefix = prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
        let dotenv = std::mem::take(&mut self.dotenv);
        for (key, value) in dotenv.iter().filter(|(k, _)| k.starts_with(dotenv_prefix)) {
            self.apply_env_var(key, value, dotenv_prefix)?;
        }
        if let Some(prefix) = prefix {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn collect_dotenv<I>(mut self, iter: I) -> Result<Self, ConfigError>
    where
        I: Iterator<Item = dotenvy::Result<(String, String)>>,
    {
        for entry in iter {
            let (key, value) = entry?;
            self.dotenv.insert(key, value);
        }
        Ok(self)
    }

    fn merge_layer(&mut self, layer: Value) -> Result<(), ConfigError> {
        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, layer);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let env_vars: BTreeMap<String, String> =
            env::vars().filter(|(k, _)| k.starts_with(prefix)).collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(key_without_prefix) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__"))
        else {
            // A different variable that happens to share the prefix.
            return Ok(());
        };

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["PIPELINE", "BEHAVIORS"] => {
                self.config.pipeline.behaviors = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::parse::<Stage>)
                    .collect::<Result<_, _>>()
                    .map_err(|e| ConfigError::env_parse_error(key, e))?;
            }
            ["PIPELINE", "SLOW_REQUEST_THRESHOLD_MS"] => {
                self.config.pipeline.slow_request_threshold_ms = parse_number(key, value)?;
            }
            ["PIPELINE", "CATCH_PANICS"] => {
                self.config.pipeline.catch_panics = parse_flag(key, value)?;
            }

            ["CACHE", "ENABLED"] => {
                self.config.cache.enabled = parse_flag(key, value)?;
            }
            ["CACHE", "DEFAULT_TTL_SECS"] => {
                self.config.cache.default_ttl_secs = parse_number(key, value)?;
            }
            ["CACHE", "MAX_ENTRIES"] => {
                self.config.cache.max_entries = parse_number(key, value)?;
            }

            ["NOTIFICATIONS", "STRATEGY"] => {
                self.config.notifications.strategy = value
                    .parse::<PublishStrategy>()
                    .map_err(|e| ConfigError::env_parse_error(key, e))?;
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_flag(key, value)?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            ["LOGGING", "INCLUDE_TARGET"] => {
                self.config.logging.include_target = parse_flag(key, value)?;
            }

            _ => {}
        }

        Ok(())
    }
}

// Objects merge recursively; everything else is replaced.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_toml_file() {
        let file = temp_file(
            ".toml",
            r#"
            [pipeline]
            behaviors = ["exception_handling", "validation"]
            slow_request_threshold_ms = 250

            [notifications]
            strategy = "concurrent"
            "#,
        );

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

        assert_eq!(
            config.pipeline.behaviors,
            vec![Stage::ExceptionHandling, Stage::Validation]
        );
        assert_eq!(config.pipeline.slow_request_threshold_ms, 250);
        assert_eq!(config.notifications.strategy, PublishStrategy::Concurrent);
        assert_eq!(config.cache.default_ttl_secs, 300);
    }

    #[test]
    fn test_loader_with_json_file() {
        let file = temp_file(".json", r#"{"cache": {"enabled": false}}"#);

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

        assert!(!config.cache.enabled);
        assert!(!config.to_pipeline_settings().cache_enabled);
    }

    #[test]
    fn test_later_layers_only_replace_what_they_set() {
        let config = ConfigLoader::new()
            .with_string("[cache]\ndefault_ttl_secs = 60\nmax_entries = 50", "toml")
            .unwrap()
            .with_string(r#"{"cache": {"max_entries": 75}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.cache.default_ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 75);
    }

    #[test]
    fn test_layer_over_preset_keeps_preset_values() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[cache]\nmax_entries = 10", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cache.max_entries, 10);
    }

    #[test]
    fn test_unknown_field_in_file_rejected() {
        let file = temp_file(".toml", "[cache]\nsize = 10\n");
        assert!(ConfigLoader::new().with_file(file.path()).is_err());
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let file = temp_file(".yaml", "cache: {}\n");
        let err = ConfigLoader::new().with_file(file.path()).expect_err("yaml");
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/hermes.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/hermes.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_invalid_values_fail_load() {
        let result = ConfigLoader::new()
            .with_string("[pipeline]\nbehaviors = []", "toml")
            .unwrap()
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_dotenv_file_overrides_layers() {
        let file = temp_file(
            ".env",
            "HERMES__CACHE__DEFAULT_TTL_SECS=30\nHERMES__LOGGING__FORMAT=compact\nOTHER=1\n",
        );

        let config = ConfigLoader::new()
            .with_string("[cache]\ndefault_ttl_secs = 60", "toml")
            .unwrap()
            .with_dotenv_file(file.path())
            .unwrap()
            .with_env_prefix("HERMES")
            .load()
            .unwrap();

        assert_eq!(config.cache.default_ttl_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_dotenv_uses_default_prefix() {
        let file = temp_file(".env", "HERMES__CACHE__MAX_ENTRIES=3\nAPP__CACHE__MAX_ENTRIES=7\n");

        let config = ConfigLoader::new()
            .with_dotenv_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.cache.max_entries, 3);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    // Process environment variables are not set in tests; the override
    // mapping is exercised through apply_env_var directly.

    #[test]
    fn test_apply_env_var_pipeline() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__PIPELINE__BEHAVIORS", "logging, caching", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__PIPELINE__CATCH_PANICS", "no", "TEST")
            .unwrap();
        assert_eq!(
            loader.config.pipeline.behaviors,
            vec![Stage::Logging, Stage::Caching]
        );
        assert!(!loader.config.pipeline.catch_panics);
    }

    #[test]
    fn test_apply_env_var_notifications() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__NOTIFICATIONS__STRATEGY", "concurrent", "TEST")
            .unwrap();
        assert_eq!(loader.config.notifications.strategy, PublishStrategy::Concurrent);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__CACHE__MAX_ENTRIES", "lots", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__PIPELINE__BEHAVIORS", "logging,tracing", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__NOTIFICATIONS__STRATEGY", "random", "TEST")
            .is_err());
    }

    #[test]
    fn test_apply_env_var_ignores_unrelated_keys() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TESTING", "1", "TEST").unwrap();
        loader.apply_env_var("TEST__UNKNOWN__KEY", "1", "TEST").unwrap();
        assert_eq!(loader.config, HermesConfig::default());
    }

    #[test]
    fn test_merge_values_recurses_into_objects() {
        let mut base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": [1]});
        merge_values(&mut base, serde_json::json!({"a": {"y": 3}, "b": [2, 3]}));
        assert_eq!(base, serde_json::json!({"a": {"x": 1, "y": 3}, "b": [2, 3]}));
    }
}
