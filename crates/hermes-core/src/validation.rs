//! Validation accumulator and the `Validate` capability.
//!
//! A request opts into validation by implementing [`Validate`] and exposing
//! it through [`Request::validator`](crate::Request::validator). The
//! validation behavior runs it into a fresh [`ValidationResult`]; any error
//! short-circuits the pipeline with [`ValidationFailure`].
//!
//! # Example
//!
//! ```
//! use hermes_core::{Validate, ValidationResult};
//!
//! struct RenameUser {
//!     name: String,
//! }
//!
//! impl Validate for RenameUser {
//!     fn validate(&self, result: &mut ValidationResult) {
//!         result.require(!self.name.is_empty(), "name.required", "Name is required");
//!     }
//! }
//!
//! let mut result = ValidationResult::new();
//! RenameUser { name: String::new() }.validate(&mut result);
//! assert!(result.has_errors());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single `(code, message)` validation error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    /// Machine-readable error code (e.g. `email.invalid`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Ordered accumulator of validation errors.
///
/// Errors keep insertion order so callers see them exactly as the
/// validator reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn add(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(code, message));
    }

    /// Records an already-built error.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Records an error unless `condition` holds.
    pub fn require(
        &mut self,
        condition: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        if !condition {
            self.add(code, message);
        }
    }

    /// Returns `true` if no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if at least one error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the recorded errors in order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consumes the accumulator, returning the recorded errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl Extend<ValidationError> for ValidationResult {
    fn extend<I: IntoIterator<Item = ValidationError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

/// Capability implemented by requests that can validate themselves.
pub trait Validate {
    /// Records every problem with `self` into `result`.
    fn validate(&self, result: &mut ValidationResult);
}

/// The structured failure returned when validation rejects a request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Validation failed for {request_type}: {}", summarize(.errors))]
pub struct ValidationFailure {
    /// Fully qualified request type name.
    pub request_type: String,
    /// Every accumulated error, in order.
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    /// Creates a new validation failure.
    #[must_use]
    pub fn new(request_type: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            request_type: request_type.into(),
            errors,
        }
    }

    /// Returns `true` if any error carries the given code.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_valid() {
        let result = ValidationResult::new();
        assert!(result.is_valid());
        assert!(!result.has_errors());
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_errors_keep_insertion_order() {
        let mut result = ValidationResult::new();
        result.add("b.second", "second");
        result.add("a.first", "first");
        result.push(ValidationError::new("c.third", "third"));

        let codes: Vec<_> = result.errors().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["b.second", "a.first", "c.third"]);
    }

    #[test]
    fn test_require_only_records_on_false() {
        let mut result = ValidationResult::new();
        result.require(true, "ok", "never recorded");
        result.require(false, "name.required", "Name is required");

        assert_eq!(result.len(), 1);
        assert_eq!(result.errors()[0].code, "name.required");
    }

    #[test]
    fn test_extend() {
        let mut result = ValidationResult::new();
        result.extend(vec![
            ValidationError::new("x", "one"),
            ValidationError::new("y", "two"),
        ]);
        assert_eq!(result.into_errors().len(), 2);
    }

    #[test]
    fn test_failure_display_lists_every_error() {
        let failure = ValidationFailure::new(
            "app::CreateUserCommand",
            vec![
                ValidationError::new("email.invalid", "Email is invalid"),
                ValidationError::new("name.required", "Name is required"),
            ],
        );

        let message = failure.to_string();
        assert!(message.contains("app::CreateUserCommand"));
        assert!(message.contains("email.invalid: Email is invalid"));
        assert!(message.contains("name.required: Name is required"));
        assert!(failure.has_code("name.required"));
        assert!(!failure.has_code("missing"));
    }
}
