//! Type-erased requests as seen by pipeline behaviors.
//!
//! Behaviors are written once for every request type, so they cannot name
//! `R`. A [`RequestEnvelope`] carries the boxed request together with a
//! [`RequestDescriptor`] and monomorphised functions that reach the
//! request's optional capabilities without knowing its type.

use crate::error::{HermesError, HermesResult};
use crate::request::{CacheDirective, Request, RequestKind};
use crate::validation::ValidationResult;
use std::any::{type_name, Any};
use std::fmt;

pub use crate::handler::ErasedResponse;

/// Static facts about a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Fully qualified request type name.
    pub request_type: &'static str,
    /// Fully qualified handler type name.
    pub handler_name: &'static str,
    /// Command or query.
    pub kind: RequestKind,
}

impl RequestDescriptor {
    /// Creates a descriptor for request type `R`.
    #[must_use]
    pub fn of<R: Request>(handler_name: &'static str) -> Self {
        Self {
            request_type: type_name::<R>(),
            handler_name,
            kind: R::kind(),
        }
    }

    /// Returns the request type name without its module path.
    #[must_use]
    pub fn short_request_type(&self) -> &'static str {
        short_name(self.request_type)
    }

    /// Returns the handler type name without its module path.
    #[must_use]
    pub fn short_handler_name(&self) -> &'static str {
        short_name(self.handler_name)
    }
}

fn short_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

type ValidateFn = fn(&(dyn Any + Send), &mut ValidationResult) -> bool;
type CacheFn = fn(&(dyn Any + Send)) -> Option<CacheDirective>;

/// A boxed request plus the functions that reach its capabilities.
pub struct RequestEnvelope {
    descriptor: RequestDescriptor,
    payload: Box<dyn Any + Send>,
    validate: ValidateFn,
    cache: CacheFn,
}

impl RequestEnvelope {
    /// Wraps a request for dispatch to the named handler.
    #[must_use]
    pub fn new<R: Request>(request: R, handler_name: &'static str) -> Self {
        Self {
            descriptor: RequestDescriptor::of::<R>(handler_name),
            payload: Box::new(request),
            validate: validate_payload::<R>,
            cache: cache_payload::<R>,
        }
    }

    /// Returns the request descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Runs the request's validator.
    ///
    /// Returns `None` when the request has no validation capability.
    #[must_use]
    pub fn validate(&self) -> Option<ValidationResult> {
        let mut result = ValidationResult::new();
        (self.validate)(self.payload.as_ref(), &mut result).then_some(result)
    }

    /// Returns the request's cache directive, if it is cacheable.
    #[must_use]
    pub fn cache_directive(&self) -> Option<CacheDirective> {
        (self.cache)(self.payload.as_ref())
    }

    /// Returns the boxed request.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    /// Consumes the envelope, returning the boxed request.
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

fn validate_payload<R: Request>(payload: &(dyn Any + Send), result: &mut ValidationResult) -> bool {
    match payload.downcast_ref::<R>().and_then(R::validator) {
        Some(validator) => {
            validator.validate(result);
            true
        }
        None => false,
    }
}

fn cache_payload<R: Request>(payload: &(dyn Any + Send)) -> Option<CacheDirective> {
    payload.downcast_ref::<R>().and_then(R::cache_directive)
}

/// Downcasts an erased response to the request's response type.
///
/// # Errors
///
/// Returns [`HermesError::Internal`] if a behavior replaced the response
/// with a value of a different type.
pub fn downcast_response<T: 'static>(response: ErasedResponse, request_type: &str) -> HermesResult<T> {
    response.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        HermesError::internal(format!(
            "response type mismatch for {request_type}: expected {}",
            type_name::<T>()
        ))
    })
}
