//! # Hermes Core
//!
//! Core contracts and types for the Hermes request mediator.
//!
//! This crate provides the foundational types used throughout Hermes:
//!
//! - [`Request`] / [`Notification`] - Marker contracts for commands, queries and events
//! - [`Handler`] / [`NotificationHandler`] - The components that fulfil them
//! - [`RegistryBuilder`] / [`HandlerRegistry`] - Type-keyed handler registration
//! - [`RequestContext`] - Per-dispatch context carrying the request ID and cancellation token
//! - [`ValidationResult`] / [`Validate`] - Validation accumulator and capability
//! - [`Outcome`] - Explicit success/failure result for expected business failures
//! - [`HermesError`] - Standard error type

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod envelope;
mod error;
pub mod fixtures;
pub mod handler;
pub mod notification;
mod outcome;
pub mod registry;
pub mod request;
pub mod validation;

use std::future::Future;
use std::pin::Pin;

pub use context::{RequestContext, RequestId};
pub use envelope::{ErasedResponse, RequestDescriptor, RequestEnvelope};
pub use error::{ErrorCategory, ErrorEnvelope, HandlerFailure, HermesError, HermesResult};
pub use handler::{FnHandler, Handler};
pub use notification::{Notification, NotificationHandler, PublishStrategy};
pub use outcome::Outcome;
pub use registry::{HandlerModule, HandlerRegistry, RegistryBuilder};
pub use request::{CacheDirective, Cacheable, Request, RequestKind};
pub use validation::{Validate, ValidationError, ValidationFailure, ValidationResult};

/// Cancellation token threaded through every dispatch.
pub use tokio_util::sync::CancellationToken;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
