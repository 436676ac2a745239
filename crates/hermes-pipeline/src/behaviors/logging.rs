//! Request logging behavior.
//!
//! Logs the start of every request at `debug` and its completion with the
//! elapsed time. Rejections (validation, cancellation) are expected outcomes
//! and log at `info`; faults log at `warn`. The single `error` entry for a
//! fault belongs to the exception-handling behavior.

use super::performance::millis;
use crate::behavior::{Behavior, Next, PipelineResult};
use crate::context::PipelineContext;
use hermes_core::{BoxFuture, RequestEnvelope};
use std::time::Instant;

/// Structured start and completion logs for each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBehavior;

impl LoggingBehavior {
    /// Creates the behavior.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Behavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let descriptor = *ctx.descriptor();
            let request_id = ctx.request_id();

            tracing::debug!(
                request_id = %request_id,
                request_type = descriptor.request_type,
                request_kind = %descriptor.kind,
                handler = descriptor.handler_name,
                "Handling request"
            );

            let started = Instant::now();
            let result = next.run(ctx, request).await;
            let duration_ms = millis(started.elapsed());

            match &result {
                Ok(_) => tracing::info!(
                    request_id = %request_id,
                    request_type = descriptor.request_type,
                    handler = descriptor.handler_name,
                    duration_ms,
                    "Handled request"
                ),
                Err(e) if e.is_validation() || e.is_cancelled() => tracing::info!(
                    request_id = %request_id,
                    request_type = descriptor.request_type,
                    handler = descriptor.handler_name,
                    duration_ms,
                    error = %e,
                    "Request rejected"
                ),
                Err(e) => tracing::warn!(
                    request_id = %request_id,
                    request_type = descriptor.request_type,
                    handler = descriptor.handler_name,
                    duration_ms,
                    error = %e,
                    "Request failed"
                ),
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::test_support::{counting_handler, failing_handler, CapturedLogs};
    use crate::context::test_context;
    use hermes_core::{HermesError, Request, RequestKind, ValidationError, ValidationFailure};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tracing::Level;

    struct RenameCommand;

    impl Request for RenameCommand {
        type Response = ();
    }

    async fn run(next: Next<'_>) -> (PipelineResult, CapturedLogs) {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let mut ctx = test_context("tests::RenameCommand", RequestKind::Command);
        let request = RequestEnvelope::new(RenameCommand, "tests::Handler");
        let result = LoggingBehavior::new().process(&mut ctx, request, next).await;
        (result, logs)
    }

    #[tokio::test]
    async fn test_success_logs_start_and_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (result, logs) = run(counting_handler(&calls, ())).await;

        assert!(result.is_ok());
        assert_eq!(logs.at(Level::DEBUG), vec!["Handling request".to_string()]);
        assert_eq!(logs.at(Level::INFO), vec!["Handled request".to_string()]);
        assert!(logs.at(Level::ERROR).is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_is_an_info_rejection() {
        let failure = ValidationFailure::new(
            "tests::RenameCommand",
            vec![ValidationError::new("name.required", "Name is required")],
        );
        let (result, logs) = run(failing_handler(failure.into())).await;

        assert!(result.is_err());
        assert_eq!(logs.at(Level::INFO), vec!["Request rejected".to_string()]);
        assert!(logs.at(Level::WARN).is_empty());
    }

    #[tokio::test]
    async fn test_fault_is_a_warning_never_an_error() {
        let (result, logs) = run(failing_handler(HermesError::fault("store offline"))).await;

        assert!(matches!(result, Err(HermesError::Fault { .. })));
        assert_eq!(logs.at(Level::WARN), vec!["Request failed".to_string()]);
        assert!(logs.at(Level::ERROR).is_empty());
    }
}
