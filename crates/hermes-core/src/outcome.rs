//! Explicit success/failure results for expected business failures.
//!
//! Handlers return `Outcome<T>` when a request can legitimately fail for
//! business reasons (a duplicate email, an unknown account). Such failures
//! are values, not errors: they flow back through the pipeline untouched and
//! are never logged as faults.

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Default code used by [`Outcome::failure`].
const DEFAULT_FAILURE_CODE: &str = "failure";

/// Result of a handler that can fail for expected reasons.
///
/// # Example
///
/// ```
/// use hermes_core::Outcome;
///
/// let created: Outcome<u64> = Outcome::success(42);
/// assert_eq!(created.value(), Some(&42));
///
/// let rejected: Outcome<u64> = Outcome::failure("User already exists");
/// assert!(rejected.is_failure());
/// assert_eq!(rejected.first_message(), Some("User already exists"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The request succeeded.
    Success(T),
    /// The request failed for the listed reasons.
    Failure(Vec<ValidationError>),
}

impl<T> Outcome<T> {
    /// Creates a successful outcome.
    #[must_use]
    pub const fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Creates a failed outcome with a single generic error.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::failure_with_code(DEFAULT_FAILURE_CODE, message)
    }

    /// Creates a failed outcome with a single coded error.
    #[must_use]
    pub fn failure_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure(vec![ValidationError::new(code, message)])
    }

    /// Creates a failed outcome from several errors.
    #[must_use]
    pub const fn invalid(errors: Vec<ValidationError>) -> Self {
        Self::Failure(errors)
    }

    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for [`Outcome::Failure`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the success value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure errors (empty on success).
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(errors) => errors,
        }
    }

    /// Returns the first failure message, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.errors().first().map(|e| e.message.as_str())
    }

    /// Maps the success value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(errors) => Outcome::Failure(errors),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, Vec<ValidationError>> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(errors) => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let outcome = Outcome::success("id-1");
        assert!(outcome.is_success());
        assert!(outcome.errors().is_empty());
        assert_eq!(outcome.into_result(), Ok("id-1"));
    }

    #[test]
    fn test_failure_uses_default_code() {
        let outcome: Outcome<()> = Outcome::failure("nope");
        assert_eq!(outcome.errors()[0].code, "failure");
        assert_eq!(outcome.first_message(), Some("nope"));
    }

    #[test]
    fn test_invalid_keeps_all_errors() {
        let outcome: Outcome<()> = Outcome::invalid(vec![
            ValidationError::new("a", "first"),
            ValidationError::new("b", "second"),
        ]);
        assert_eq!(outcome.errors().len(), 2);
    }

    #[test]
    fn test_map_only_touches_success() {
        assert_eq!(Outcome::success(2).map(|v| v * 10), Outcome::Success(20));

        let failed: Outcome<i32> = Outcome::failure_with_code("x", "bad");
        assert!(failed.map(|v| v * 10).is_failure());
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(Outcome::success(7)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "success": 7 }));
    }
}
