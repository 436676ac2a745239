//! Error types for Hermes.
//!
//! This module provides the [`HermesError`] type, the single error channel
//! used by the registry, the behavior pipeline, handlers and the publisher.
//!
//! # Error taxonomy
//!
//! | `ErrorCategory` | Variants | HTTP class |
//! |---|---|---|
//! | `Configuration` | `Configuration`, `HandlerNotFound` | 500 |
//! | `Validation` | `Validation` | 400 |
//! | `Cancelled` | `Cancelled` | 499 |
//! | `Fault` | `Fault`, `Panic`, `Processing`, `Publish`, `Internal` | 500 |
//!
//! Only the outermost exception-handling behavior wraps errors (into
//! [`HermesError::Processing`]); every other layer passes them through.

use crate::validation::{ValidationError, ValidationFailure};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Result type alias using [`HermesError`].
pub type HermesResult<T> = Result<T, HermesError>;

/// Non-standard "client closed request" status used for cancellations.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Duplicate or missing handler registration, invalid pipeline setup.
    Configuration,
    /// One or more accumulated validation errors.
    Validation,
    /// Cooperative abort signalled by the caller.
    Cancelled,
    /// Any other handler or behavior failure.
    Fault,
}

impl ErrorCategory {
    /// Returns the HTTP status code a consuming HTTP layer should use.
    #[must_use]
    pub fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Configuration | Self::Fault => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),
        }
    }
}

/// Standard error type for Hermes.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, HermesError};
///
/// let err = HermesError::configuration("handler registered twice");
/// assert_eq!(err.category(), ErrorCategory::Configuration);
/// ```
#[derive(Error, Debug)]
pub enum HermesError {
    /// Invalid mediator setup (e.g. a request type registered twice).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// No handler is registered for the dispatched request type.
    #[error("No handler registered for type {request_type}")]
    HandlerNotFound {
        /// Fully qualified request type name.
        request_type: &'static str,
    },

    /// The request failed validation and never reached its handler.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The caller cancelled the dispatch.
    #[error("Request was cancelled")]
    Cancelled,

    /// A handler or behavior failed.
    #[error("Handler fault: {message}")]
    Fault {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A handler or behavior panicked.
    #[error("Handler panicked: {message}")]
    Panic {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// Uniform failure raised by the exception-handling behavior.
    #[error("Request processing failed for {request_type}")]
    Processing {
        /// Fully qualified request type name.
        request_type: &'static str,
        /// The original error.
        #[source]
        source: Box<HermesError>,
    },

    /// One or more notification handlers failed.
    #[error("{} notification handler(s) failed for {notification_type}", failures.len())]
    Publish {
        /// Fully qualified notification type name.
        notification_type: &'static str,
        /// Every failure, in handler registration order.
        failures: Vec<HandlerFailure>,
    },

    /// Internal invariant violation inside the mediator.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl HermesError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a fault without an underlying source.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fault wrapping an underlying error.
    pub fn fault_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Fault {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a panic error.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self::Panic {
            message: message.into(),
        }
    }

    /// Creates a panic error from a caught unwind payload.
    ///
    /// `&str` and `String` payloads become the message.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic { message }
    }

    /// Wraps an error into the uniform processing failure.
    #[must_use]
    pub fn processing(request_type: &'static str, source: HermesError) -> Self {
        Self::Processing {
            request_type,
            source: Box::new(source),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } | Self::HandlerNotFound { .. } => {
                ErrorCategory::Configuration
            }
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Fault { .. }
            | Self::Panic { .. }
            | Self::Processing { .. }
            | Self::Publish { .. }
            | Self::Internal { .. } => ErrorCategory::Fault,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns `true` for validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` for cancellations.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the accumulated validation errors, if this is a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            Self::Validation(failure) => Some(&failure.errors),
            _ => None,
        }
    }

    /// Follows [`HermesError::Processing`] wrappers down to the original error.
    #[must_use]
    pub fn root_cause(&self) -> &HermesError {
        let mut current = self;
        while let Self::Processing { source, .. } = current {
            current = source;
        }
        current
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::HandlerNotFound { .. } => "HANDLER_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Fault { .. } => "HANDLER_FAULT",
            Self::Panic { .. } => "HANDLER_PANIC",
            Self::Processing { .. } => "REQUEST_PROCESSING_FAILED",
            Self::Publish { .. } => "NOTIFICATION_FAILED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation(failure) => Some(serde_json::json!({
                "request_type": failure.request_type,
                "errors": failure.errors,
            })),
            Self::HandlerNotFound { request_type } => Some(serde_json::json!({
                "request_type": request_type
            })),
            Self::Processing { request_type, .. } => Some(serde_json::json!({
                "request_type": request_type
            })),
            Self::Publish {
                notification_type,
                failures,
            } => Some(serde_json::json!({
                "notification_type": notification_type,
                "failed_handlers": failures.iter().map(|f| f.handler).collect::<Vec<_>>(),
            })),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for HermesError {
    fn from(error: anyhow::Error) -> Self {
        Self::Fault {
            message: error.to_string(),
            source: Some(error),
        }
    }
}

/// A single notification handler failure collected by the publisher.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Type name of the failing handler.
    pub handler: &'static str,
    /// The error it returned.
    pub error: HermesError,
}

impl HandlerFailure {
    /// Creates a new handler failure record.
    #[must_use]
    pub const fn new(handler: &'static str, error: HermesError) -> Self {
        Self { handler, error }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.handler, self.error)
    }
}

/// Serializable error envelope for the consuming transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
