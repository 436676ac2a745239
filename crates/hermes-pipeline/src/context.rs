//! Pipeline context types.
//!
//! The [`PipelineContext`] carries state through the behavior chain. It
//! wraps the caller's [`RequestContext`] and adds the request descriptor and
//! a typed extension map that behaviors use to hand data to each other.

use hermes_core::{CancellationToken, RequestContext, RequestDescriptor, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Context that flows through the behavior pipeline.
///
/// # Example
///
/// ```
/// use hermes_core::{RequestContext, RequestDescriptor, RequestKind};
/// use hermes_pipeline::context::PipelineContext;
///
/// let descriptor = RequestDescriptor {
///     request_type: "app::PingQuery",
///     handler_name: "app::PingHandler",
///     kind: RequestKind::Query,
/// };
/// let ctx = PipelineContext::new(RequestContext::new(), descriptor);
/// assert_eq!(ctx.descriptor().request_type, "app::PingQuery");
/// ```
#[derive(Debug)]
pub struct PipelineContext {
    /// The caller's context; handed to the handler.
    request: RequestContext,

    /// What is being dispatched, and to whom.
    descriptor: RequestDescriptor,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PipelineContext {
    /// Creates a pipeline context for one dispatch.
    #[must_use]
    pub fn new(request: RequestContext, descriptor: RequestDescriptor) -> Self {
        Self {
            request,
            descriptor,
            extensions: HashMap::new(),
        }
    }

    /// Returns the caller's request context.
    #[must_use]
    pub const fn request_context(&self) -> &RequestContext {
        &self.request
    }

    /// Returns the request descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request.request_id()
    }

    /// Returns the caller's cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        self.request.cancellation()
    }

    /// Returns when the dispatch started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.request.started_at()
    }

    /// Returns the elapsed time since the dispatch started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.request.elapsed()
    }

    /// Stores a typed extension value, replacing any previous value.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::{RequestContext, RequestDescriptor, RequestKind};
    /// use hermes_pipeline::context::PipelineContext;
    ///
    /// struct TenantId(u32);
    ///
    /// let descriptor = RequestDescriptor {
    ///     request_type: "app::PingQuery",
    ///     handler_name: "app::PingHandler",
    ///     kind: RequestKind::Query,
    /// };
    /// let mut ctx = PipelineContext::new(RequestContext::new(), descriptor);
    /// ctx.set_extension(TenantId(7));
    /// assert_eq!(ctx.get_extension::<TenantId>().map(|t| t.0), Some(7));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns `true` if an extension of type `T` is present.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
pub(crate) fn test_context(request_type: &'static str, kind: hermes_core::RequestKind) -> PipelineContext {
    PipelineContext::new(
        RequestContext::new(),
        RequestDescriptor {
            request_type,
            handler_name: "tests::Handler",
            kind,
        },
    )
}
