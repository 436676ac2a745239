//! Built-in pipeline behaviors.
//!
//! | Behavior | Stage | Applies to |
//! |----------|-------|------------|
//! | [`ExceptionHandlingBehavior`] | [`Stage::ExceptionHandling`](crate::Stage::ExceptionHandling) | all requests |
//! | [`LoggingBehavior`] | [`Stage::Logging`](crate::Stage::Logging) | all requests |
//! | [`PerformanceBehavior`] | [`Stage::Performance`](crate::Stage::Performance) | all requests |
//! | [`ValidationBehavior`] | [`Stage::Validation`](crate::Stage::Validation) | all requests |
//! | [`CachingBehavior`] | [`Stage::Caching`](crate::Stage::Caching) | queries |

mod caching;
mod exception;
mod logging;
mod performance;
mod validation;

pub use caching::CachingBehavior;
pub use exception::ExceptionHandlingBehavior;
pub use logging::LoggingBehavior;
pub use performance::{PerformanceBehavior, RequestTiming};
pub use validation::ValidationBehavior;

use crate::behavior::PipelineResult;
use hermes_core::ErrorCategory;

/// Classifies a pipeline result for metric labels.
pub(crate) fn outcome_label(result: &PipelineResult) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => match e.category() {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Configuration | ErrorCategory::Fault => "fault",
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{ErasedResponse, HermesError, ValidationFailure};

    #[test]
    fn test_outcome_labels() {
        let ok: PipelineResult = Ok(Box::new(()) as ErasedResponse);
        assert_eq!(outcome_label(&ok), "success");
        assert_eq!(
            outcome_label(&Err(ValidationFailure::new("T", vec![]).into())),
            "validation"
        );
        assert_eq!(outcome_label(&Err(HermesError::Cancelled)), "cancelled");
        assert_eq!(outcome_label(&Err(HermesError::fault("boom"))), "fault");
    }
}
