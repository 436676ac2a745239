//! Typed configuration for Hermes.
//!
//! This crate provides a strongly-typed configuration for the mediator with
//! support for:
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//!
//! # Overview
//!
//! [`HermesConfig`] holds four sections:
//!
//! - [`PipelineSection`] - Which built-in behaviors run, and in what order
//! - [`CacheSection`] - Query cache defaults and capacity
//! - [`NotificationSection`] - Sequential or concurrent publishing
//! - [`LoggingSection`] - Log level and output format
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("hermes.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("slow threshold: {}ms", config.pipeline.slow_request_threshold_ms);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [pipeline]
//! behaviors = ["exception_handling", "logging", "performance", "validation", "caching"]
//! slow_request_threshold_ms = 500
//! catch_panics = true
//!
//! [cache]
//! enabled = true
//! default_ttl_secs = 300
//! max_entries = 10000
//!
//! [notifications]
//! strategy = "sequential"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! include_target = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with variables named `PREFIX__SECTION__KEY`:
//!
//! - `HERMES__PIPELINE__BEHAVIORS=exception_handling,validation`
//! - `HERMES__CACHE__DEFAULT_TTL_SECS=60`
//! - `HERMES__NOTIFICATIONS__STRATEGY=concurrent`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{CacheSection, LoggingSection, NotificationSection, PipelineSection};
