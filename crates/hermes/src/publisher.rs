//! Notification fan-out.
//!
//! Every registered handler of a notification is attempted, in registration
//! order for [`PublishStrategy::Sequential`] or polled together on the
//! caller's task for [`PublishStrategy::Concurrent`]. Failures are logged as
//! they happen and returned together as [`HermesError::Publish`].
//!
//! A panicking handler is caught and reported as [`HermesError::Panic`] in
//! the aggregate; the remaining handlers still run.
//!
//! Cancellation is the exception: it stops a sequential publish before the
//! next handler starts, and it is returned as [`HermesError::Cancelled`]
//! rather than folded into the aggregate. Failures collected before the
//! cancellation are still logged and counted.

use futures_util::future::join_all;
use futures_util::FutureExt;
use hermes_core::notification::ErasedNotificationHandler;
use hermes_core::{
    HandlerFailure, HermesError, HermesResult, Notification, PublishStrategy, RequestContext,
};
use hermes_telemetry::metrics::record_notification_failure;
use std::any::{type_name, Any};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Invokes notification handlers with a fixed [`PublishStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationPublisher {
    strategy: PublishStrategy,
}

impl NotificationPublisher {
    /// Creates a publisher.
    #[must_use]
    pub const fn new(strategy: PublishStrategy) -> Self {
        Self { strategy }
    }

    /// Returns the configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> PublishStrategy {
        self.strategy
    }

    /// Delivers `notification` to every handler.
    ///
    /// # Errors
    ///
    /// - [`HermesError::Cancelled`] if the context is cancelled or a handler
    ///   reports cancellation
    /// - [`HermesError::Publish`] listing every failed handler otherwise
    pub async fn publish<N: Notification>(
        &self,
        handlers: &[Arc<dyn ErasedNotificationHandler>],
        notification: &N,
        ctx: &RequestContext,
    ) -> HermesResult<()> {
        let notification_type = type_name::<N>();

        if handlers.is_empty() {
            tracing::debug!(
                request_id = %ctx.request_id(),
                notification_type,
                "No handlers registered for notification"
            );
            return Ok(());
        }

        ctx.ensure_not_cancelled()?;

        let payload: &(dyn Any + Send + Sync) = notification;
        let results = match self.strategy {
            PublishStrategy::Sequential => {
                let mut results = Vec::with_capacity(handlers.len());
                for handler in handlers {
                    if ctx.is_cancelled() {
                        results.push((handler.handler_name(), Err(HermesError::Cancelled)));
                        break;
                    }
                    let result = invoke(handler.as_ref(), payload, ctx).await;
                    let cancelled = matches!(result, Err(HermesError::Cancelled));
                    results.push((handler.handler_name(), result));
                    if cancelled {
                        break;
                    }
                }
                results
            }
            PublishStrategy::Concurrent => {
                join_all(handlers.iter().map(|handler| async move {
                    (handler.handler_name(), invoke(handler.as_ref(), payload, ctx).await)
                }))
                .await
            }
        };

        tracing::debug!(
            request_id = %ctx.request_id(),
            notification_type,
            strategy = %self.strategy,
            handlers = results.len(),
            "Published notification"
        );

        aggregate(notification_type, ctx, results)
    }
}

async fn invoke(
    handler: &dyn ErasedNotificationHandler,
    payload: &(dyn Any + Send + Sync),
    ctx: &RequestContext,
) -> HermesResult<()> {
    AssertUnwindSafe(handler.handle_erased(payload, ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(HermesError::from_panic(panic.as_ref())))
}

fn aggregate(
    notification_type: &'static str,
    ctx: &RequestContext,
    results: Vec<(&'static str, HermesResult<()>)>,
) -> HermesResult<()> {
    let mut failures = Vec::new();
    let mut cancelled = false;
    for (handler, result) in results {
        match result {
            Ok(()) => {}
            Err(HermesError::Cancelled) => cancelled = true,
            Err(error) => {
                record_notification_failure(notification_type, handler);
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    notification_type,
                    handler,
                    error = %error,
                    "Notification handler failed"
                );
                failures.push(HandlerFailure::new(handler, error));
            }
        }
    }

    if cancelled {
        Err(HermesError::Cancelled)
    } else if failures.is_empty() {
        Ok(())
    } else {
        Err(HermesError::Publish {
            notification_type,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{HandlerRegistry, NotificationHandler};
    use parking_lot::Mutex;

    struct InvoiceIssued;
    impl Notification for InvoiceIssued {}

    struct Step {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail_with: Option<fn() -> HermesError>,
    }

    impl NotificationHandler<InvoiceIssued> for Step {
        async fn handle(&self, _event: &InvoiceIssued, _ctx: &RequestContext) -> HermesResult<()> {
            self.log.lock().push(self.name);
            self.fail_with.map_or(Ok(()), |fail| Err(fail()))
        }
    }

    fn registry(steps: Vec<Step>) -> HandlerRegistry {
        let mut builder = HandlerRegistry::builder();
        for step in steps {
            builder.register_notification_handler::<InvoiceIssued, _>(step);
        }
        builder.build()
    }

    fn step(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail_with: Option<fn() -> HermesError>,
    ) -> Step {
        Step {
            name,
            log: Arc::clone(log),
            fail_with,
        }
    }

    fn mailer_down() -> HermesError {
        HermesError::fault("mailer down")
    }

    fn cancelled() -> HermesError {
        HermesError::Cancelled
    }

    fn jammed() -> HermesError {
        panic!("printer jammed")
    }

    async fn publish(strategy: PublishStrategy, registry: &HandlerRegistry, ctx: &RequestContext) -> HermesResult<()> {
        NotificationPublisher::new(strategy)
            .publish(
                registry.resolve_notification_handlers::<InvoiceIssued>(),
                &InvoiceIssued,
                ctx,
            )
            .await
    }

    #[tokio::test]
    async fn test_no_handlers_is_ok() {
        let registry = HandlerRegistry::builder().build();
        assert!(publish(PublishStrategy::Sequential, &registry, &RequestContext::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sequential_attempts_every_handler_and_aggregates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(vec![
            step("ledger", &log, None),
            step("email", &log, Some(mailer_down)),
            step("audit", &log, None),
        ]);

        let err = publish(PublishStrategy::Sequential, &registry, &RequestContext::new())
            .await
            .expect_err("one handler failed");

        assert_eq!(*log.lock(), vec!["ledger", "email", "audit"]);
        match err {
            HermesError::Publish { failures, .. } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].handler.ends_with("Step"));
            }
            other => panic!("expected publish failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_attempts_every_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(vec![
            step("ledger", &log, Some(mailer_down)),
            step("email", &log, Some(mailer_down)),
            step("audit", &log, None),
        ]);

        let err = publish(PublishStrategy::Concurrent, &registry, &RequestContext::new())
            .await
            .expect_err("two handlers failed");

        assert_eq!(log.lock().len(), 3);
        assert!(matches!(err, HermesError::Publish { ref failures, .. } if failures.len() == 2));
    }

    #[tokio::test]
    async fn test_cancelled_context_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(vec![step("ledger", &log, None)]);
        let ctx = RequestContext::new();
        ctx.cancellation().cancel();

        let result = publish(PublishStrategy::Sequential, &registry, &ctx).await;

        assert!(matches!(result, Err(HermesError::Cancelled)));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_handler_cancellation_is_not_wrapped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(vec![
            step("ledger", &log, Some(cancelled)),
            step("email", &log, Some(mailer_down)),
        ]);

        let result = publish(PublishStrategy::Sequential, &registry, &RequestContext::new()).await;

        assert!(matches!(result, Err(HermesError::Cancelled)));
        assert_eq!(*log.lock(), vec!["ledger"]);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        for strategy in [PublishStrategy::Sequential, PublishStrategy::Concurrent] {
            let log = Arc::new(Mutex::new(Vec::new()));
            let registry = registry(vec![
                step("ledger", &log, None),
                step("printer", &log, Some(jammed)),
                step("audit", &log, None),
            ]);

            let err = publish(strategy, &registry, &RequestContext::new())
                .await
                .expect_err("printer panicked");

            let mut ran = log.lock().clone();
            ran.sort_unstable();
            assert_eq!(ran, vec!["audit", "ledger", "printer"], "{strategy}");
            match err {
                HermesError::Publish { failures, .. } => {
                    assert_eq!(failures.len(), 1);
                    assert!(
                        matches!(&failures[0].error, HermesError::Panic { message } if message == "printer jammed")
                    );
                }
                other => panic!("expected publish failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_after_a_failure_still_returns_cancelled() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(vec![
            step("email", &log, Some(mailer_down)),
            step("ledger", &log, Some(cancelled)),
            step("audit", &log, None),
        ]);

        let result = publish(PublishStrategy::Sequential, &registry, &RequestContext::new()).await;

        assert!(matches!(result, Err(HermesError::Cancelled)));
        assert_eq!(*log.lock(), vec!["email", "ledger"]);
    }
}
