//! Fault containment behavior.
//!
//! Sits outermost in the standard pipeline. Validation failures,
//! cancellations and already-wrapped failures pass through untouched. Every
//! other error is logged once at `error` with the request's identity and
//! elapsed time, then wrapped in [`HermesError::Processing`] so callers see a
//! uniform failure whose source is the original error.
//!
//! With `catch_panics` enabled, a panic anywhere inside the chain becomes a
//! [`HermesError::Panic`] and takes the same path.

use super::performance::{millis, RequestTiming};
use crate::behavior::{Behavior, Next, PipelineResult};
use crate::context::PipelineContext;
use futures_util::FutureExt;
use hermes_core::{BoxFuture, HermesError, RequestEnvelope};
use std::panic::AssertUnwindSafe;

/// Converts unexpected failures into [`HermesError::Processing`].
#[derive(Debug, Clone, Copy)]
pub struct ExceptionHandlingBehavior {
    catch_panics: bool,
}

impl ExceptionHandlingBehavior {
    /// Creates the behavior.
    #[must_use]
    pub const fn new(catch_panics: bool) -> Self {
        Self { catch_panics }
    }

    /// Returns whether panics are converted into errors.
    #[must_use]
    pub const fn catches_panics(&self) -> bool {
        self.catch_panics
    }
}

impl Default for ExceptionHandlingBehavior {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Behavior for ExceptionHandlingBehavior {
    fn name(&self) -> &'static str {
        "exception_handling"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let descriptor = *ctx.descriptor();

            let result = if self.catch_panics {
                AssertUnwindSafe(next.run(ctx, request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(HermesError::from_panic(payload.as_ref())))
            } else {
                next.run(ctx, request).await
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) if passes_through(&e) => return Err(e),
                Err(e) => e,
            };

            let elapsed = ctx
                .get_extension::<RequestTiming>()
                .map_or_else(|| ctx.elapsed(), |timing| timing.elapsed);

            tracing::error!(
                request_id = %ctx.request_id(),
                request_type = descriptor.request_type,
                handler = descriptor.handler_name,
                duration_ms = millis(elapsed),
                error = %error,
                "Request processing failed"
            );

            Err(HermesError::processing(descriptor.request_type, error))
        })
    }
}

fn passes_through(error: &HermesError) -> bool {
    matches!(
        error,
        HermesError::Validation(_) | HermesError::Cancelled | HermesError::Processing { .. }
    )
}
