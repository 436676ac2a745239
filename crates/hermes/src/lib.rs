//! # Hermes
//!
//! **In-process request mediator for Rust services**
//!
//! Hermes decouples the code that asks for something from the code that does
//! it:
//!
//! - **Requests** (commands and queries) go to exactly one handler
//! - **Notifications** fan out to any number of handlers
//! - **Behaviors** wrap every request in an ordered, configurable pipeline
//!   (fault containment, logging, timing, validation, query caching)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! let mediator = Mediator::builder()
//!     .module(&BillingModule::new(db))
//!     .standard_behaviors(&PipelineSettings::default())
//!     .build()?;
//!
//! let invoice = mediator.send(GetInvoiceQuery { id }, CancellationToken::new()).await?;
//! mediator.publish(InvoiceViewed { id }, CancellationToken::new()).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! send → ExceptionHandling → Logging → Performance → Validation → Caching → Handler
//! publish → handler 1, handler 2, ... (sequential or concurrent, failures aggregated)
//! ```
//!
//! The pieces live in separate crates, re-exported here:
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `hermes-core` | Request, handler, registry, errors |
//! | [`pipeline`] | `hermes-pipeline` | Behaviors and cache store |
//! | [`telemetry`] | `hermes-telemetry` | Logging and metrics setup |
//! | [`config`] | `hermes-config` | Layered configuration |

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod mediator;
pub mod publisher;

pub use mediator::{Mediator, MediatorBuilder};
pub use publisher::NotificationPublisher;

// Re-export core types
pub use hermes_core as core;

// Re-export pipeline types
pub use hermes_pipeline as pipeline;

// Re-export telemetry types
pub use hermes_telemetry as telemetry;

// Re-export configuration types
pub use hermes_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use hermes::prelude::*;
///
/// let mediator = Mediator::builder().build();
/// assert!(mediator.is_ok());
/// ```
pub mod prelude {
    pub use crate::{Mediator, MediatorBuilder};

    pub use hermes_core::{
        CacheDirective, Cacheable, CancellationToken, FnHandler, Handler, HandlerModule,
        HermesError, HermesResult, Notification, NotificationHandler, Outcome, PublishStrategy,
        RegistryBuilder, Request, RequestContext, RequestId, RequestKind, Validate,
        ValidationError, ValidationResult,
    };

    pub use hermes_pipeline::{
        Behavior, FnBehavior, Next, PipelineContext, PipelineResult, PipelineSettings, Stage,
    };

    pub use hermes_config::{ConfigLoader, HermesConfig};
}
