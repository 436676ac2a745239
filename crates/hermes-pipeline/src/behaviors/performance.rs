//! Request timing behavior.

use super::outcome_label;
use crate::behavior::{Behavior, Next, PipelineResult};
use crate::context::PipelineContext;
use hermes_core::{BoxFuture, RequestEnvelope};
use hermes_telemetry::metrics::{record_request, record_slow_request};
use std::time::{Duration, Instant};

/// How long the rest of the chain took, stored in the [`PipelineContext`]
/// after every request that passes through [`PerformanceBehavior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTiming {
    /// Time spent in the inner behaviors and the handler.
    pub elapsed: Duration,
    /// Whether `elapsed` exceeded the slow-request threshold.
    pub slow: bool,
}

/// Times every request and flags the ones slower than a threshold.
///
/// Records `hermes_requests_total` and `hermes_request_duration_seconds`
/// for every outcome. A request whose elapsed time is strictly greater than
/// the threshold also gets a warning and `hermes_slow_requests_total`.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceBehavior {
    threshold: Duration,
}

impl PerformanceBehavior {
    /// Creates the behavior with the given slow-request threshold.
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Returns the slow-request threshold.
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl Behavior for PerformanceBehavior {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let descriptor = *ctx.descriptor();
            let started = Instant::now();

            let result = next.run(ctx, request).await;

            let elapsed = started.elapsed();
            let slow = elapsed > self.threshold;
            ctx.set_extension(RequestTiming { elapsed, slow });
            record_request(descriptor.request_type, outcome_label(&result), elapsed);

            if slow {
                record_slow_request(descriptor.request_type);
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    request_type = descriptor.request_type,
                    handler = descriptor.handler_name,
                    duration_ms = millis(elapsed),
                    threshold_ms = millis(self.threshold),
                    "Slow request detected"
                );
            }

            result
        })
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::test_support::{counting_handler, failing_handler, CapturedLogs};
    use crate::context::test_context;
    use hermes_core::{ErasedResponse, HermesError, Request, RequestKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::Level;

    struct ReportQuery;

    impl Request for ReportQuery {
        type Response = u32;
    }

    fn sleeping_handler<'a>(delay: Duration) -> Next<'a> {
        Next::handler(move |_ctx, _request| {
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(Box::new(1_u32) as ErasedResponse)
            })
        })
    }

    #[tokio::test]
    async fn test_slow_request_is_flagged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let mut ctx = test_context("tests::ReportQuery", RequestKind::Query);
        let request = RequestEnvelope::new(ReportQuery, "tests::Handler");

        let result = PerformanceBehavior::new(Duration::from_millis(5))
            .process(&mut ctx, request, sleeping_handler(Duration::from_millis(20)))
            .await;

        assert!(result.is_ok());
        let timing = ctx.get_extension::<RequestTiming>().copied().expect("timing");
        assert!(timing.slow);
        assert!(timing.elapsed >= Duration::from_millis(20));
        assert_eq!(logs.at(Level::WARN), vec!["Slow request detected".to_string()]);
    }

    #[tokio::test]
    async fn test_fast_request_is_not_flagged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = test_context("tests::ReportQuery", RequestKind::Query);
        let request = RequestEnvelope::new(ReportQuery, "tests::Handler");

        PerformanceBehavior::new(Duration::from_secs(5))
            .process(&mut ctx, request, counting_handler(&calls, 1_u32))
            .await
            .expect("report");

        let timing = ctx.get_extension::<RequestTiming>().copied().expect("timing");
        assert!(!timing.slow);
        assert!(logs.at(Level::WARN).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_timed_and_returned_unchanged() {
        let mut ctx = test_context("tests::ReportQuery", RequestKind::Query);
        let request = RequestEnvelope::new(ReportQuery, "tests::Handler");

        let err = PerformanceBehavior::new(Duration::from_secs(5))
            .process(&mut ctx, request, failing_handler(HermesError::fault("disk full")))
            .await
            .expect_err("handler fails");

        assert!(matches!(err, HermesError::Fault { .. }));
        assert!(ctx.has_extension::<RequestTiming>());
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
