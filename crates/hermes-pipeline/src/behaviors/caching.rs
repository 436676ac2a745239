//! Query response caching behavior.
//!
//! Applies only to queries that expose a cache directive. A request counts as
//! a query here only if its type name says so; overriding `Request::kind`
//! does not make a command cacheable. A hit returns a
//! clone of the stored response without calling the handler; a miss calls
//! the handler once and stores a successful response for the request's own
//! duration or the configured default. Errors are never cached.

use crate::behavior::{Behavior, Next, PipelineResult};
use crate::cache::CacheStore;
use crate::context::PipelineContext;
use hermes_core::{BoxFuture, RequestDescriptor, RequestEnvelope, RequestKind};
use hermes_telemetry::metrics::record_cache_lookup;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Serves repeated queries from a [`CacheStore`].
pub struct CachingBehavior {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl CachingBehavior {
    /// Creates the behavior over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }
}

impl fmt::Debug for CachingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingBehavior")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl Behavior for CachingBehavior {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn applies_to(&self, descriptor: &RequestDescriptor) -> bool {
        descriptor.kind == RequestKind::Query
            && RequestKind::from_type_name(descriptor.request_type) == RequestKind::Query
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let Some(directive) = request.cache_directive() else {
                return next.run(ctx, request).await;
            };
            let request_type = request.descriptor().request_type;
            let key = directive.key();

            if let Some(response) = self
                .store
                .get(&key)
                .and_then(|cached| directive.restore(cached.as_ref()))
            {
                record_cache_lookup(request_type, true);
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    request_type,
                    "Cache hit"
                );
                return Ok(response);
            }

            record_cache_lookup(request_type, false);
            let response = next.run(ctx, request).await?;

            if let Some(shared) = directive.share(response.as_ref()) {
                let ttl = directive.ttl().unwrap_or(self.default_ttl);
                self.store.set(key, shared, ttl);
            }

            Ok(response)
        })
    }
}
