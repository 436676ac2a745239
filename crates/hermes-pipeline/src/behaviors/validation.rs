//! Request validation behavior.
//!
//! Runs the request's [`Validate`](hermes_core::Validate) capability before
//! the handler. Any error short-circuits the chain with
//! [`HermesError::Validation`] carrying every error in order; the handler is
//! never invoked. Requests without the capability pass straight through.

use crate::behavior::{Behavior, Next, PipelineResult};
use crate::context::PipelineContext;
use hermes_core::{BoxFuture, HermesError, RequestEnvelope, ValidationFailure};
use hermes_telemetry::metrics::record_validation_failure;

/// Rejects requests whose validator reports errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationBehavior;

impl ValidationBehavior {
    /// Creates the behavior.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Behavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if let Some(result) = request.validate() {
                if result.has_errors() {
                    let request_type = request.descriptor().request_type;
                    record_validation_failure(request_type);
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        request_type,
                        errors = result.len(),
                        "Request failed validation"
                    );
                    return Err(HermesError::Validation(ValidationFailure::new(
                        request_type,
                        result.into_errors(),
                    )));
                }
            }

            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::test_support::{counting_handler, expect_value};
    use crate::context::test_context;
    use hermes_core::{Request, RequestKind, Validate, ValidationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RegisterCommand {
        email: String,
        age: u8,
    }

    impl Validate for RegisterCommand {
        fn validate(&self, result: &mut ValidationResult) {
            result.require(self.email.contains('@'), "email.invalid", "Email is invalid");
            result.require(self.age >= 18, "age.minimum", "Must be an adult");
        }
    }

    impl Request for RegisterCommand {
        type Response = u32;

        fn validator(&self) -> Option<&dyn Validate> {
            Some(self)
        }
    }

    struct PlainCommand;

    impl Request for PlainCommand {
        type Response = u32;
    }

    fn envelope<R: Request>(request: R) -> RequestEnvelope {
        RequestEnvelope::new(request, "tests::Handler")
    }

    #[tokio::test]
    async fn test_invalid_request_short_circuits_with_all_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = test_context("tests::RegisterCommand", RequestKind::Command);
        let request = envelope(RegisterCommand {
            email: "nope".into(),
            age: 12,
        });

        let err = ValidationBehavior::new()
            .process(&mut ctx, request, counting_handler(&calls, 1_u32))
            .await
            .expect_err("validation should fail");

        assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must not run");
        let codes: Vec<_> = err
            .validation_errors()
            .expect("validation errors")
            .iter()
            .map(|e| e.code.as_str())
            .collect();
        assert_eq!(codes, vec!["email.invalid", "age.minimum"]);
    }

    #[tokio::test]
    async fn test_valid_request_reaches_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = test_context("tests::RegisterCommand", RequestKind::Command);
        let request = envelope(RegisterCommand {
            email: "a@b.c".into(),
            age: 30,
        });

        let result = ValidationBehavior::new()
            .process(&mut ctx, request, counting_handler(&calls, 7_u32))
            .await;

        assert_eq!(expect_value::<u32>(result), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_without_validator_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = test_context("tests::PlainCommand", RequestKind::Command);

        let result = ValidationBehavior::new()
            .process(&mut ctx, envelope(PlainCommand), counting_handler(&calls, 3_u32))
            .await;

        assert_eq!(expect_value::<u32>(result), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
