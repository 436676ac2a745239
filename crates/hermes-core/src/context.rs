//! Request context types.
//!
//! The [`RequestContext`] carries per-dispatch state from the caller through
//! the behavior pipeline and into handlers.

use crate::error::{HermesError, HermesResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A unique identifier for each dispatch, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    ///
    /// Useful when an upstream layer already assigned a correlation ID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-dispatch context handed to every behavior and handler.
///
/// `RequestContext` carries:
/// - A unique request ID for log correlation
/// - The caller's [`CancellationToken`]
/// - The instant the dispatch started
///
/// The mediator never acts on the cancellation token itself; it only forwards
/// it. Handlers check it at their own I/O boundaries, typically through
/// [`RequestContext::ensure_not_cancelled`].
///
/// # Example
///
/// ```
/// use hermes_core::{CancellationToken, RequestContext};
///
/// let token = CancellationToken::new();
/// let ctx = RequestContext::with_cancellation(token.clone());
/// assert!(ctx.ensure_not_cancelled().is_ok());
///
/// token.cancel();
/// assert!(ctx.ensure_not_cancelled().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this dispatch.
    request_id: RequestId,

    /// Cooperative cancellation signal owned by the caller.
    cancellation: CancellationToken,

    /// When the dispatch started.
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new context with a fresh request ID and a token that is
    /// never cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Creates a new context bound to the caller's cancellation token.
    #[must_use]
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            request_id: RequestId::new(),
            cancellation,
            started_at: Instant::now(),
        }
    }

    /// Returns a new context carrying the given request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` if the caller has cancelled this dispatch.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns [`HermesError::Cancelled`] if the caller has cancelled.
    pub fn ensure_not_cancelled(&self) -> HermesResult<()> {
        if self.is_cancelled() {
            Err(HermesError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Returns when the dispatch started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the dispatch started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_with_request_id() {
        let id = RequestId::from_uuid(Uuid::now_v7());
        let ctx = RequestContext::new().with_request_id(id);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_new_context_is_not_cancelled() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.ensure_not_cancelled().is_ok());
    }

    #[test]
    fn test_cancellation_is_observed_through_clones() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_cancellation(token.clone());
        let cloned = ctx.clone();

        token.cancel();

        assert!(ctx.is_cancelled());
        assert!(matches!(
            cloned.ensure_not_cancelled(),
            Err(HermesError::Cancelled)
        ));
    }

    #[test]
    fn test_elapsed() {
        let ctx = RequestContext::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.elapsed() >= Duration::from_millis(5));
    }
}
