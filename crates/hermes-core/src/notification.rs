//! Notification contracts.
//!
//! A [`Notification`] describes something that already happened. It is
//! delivered to every registered [`NotificationHandler`]; having none is not
//! an error.

use crate::error::HermesResult;
use crate::{BoxFuture, RequestContext};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;

/// Marker for broadcast events.
pub trait Notification: Send + Sync + 'static {}

/// A trait for reacting to one notification type.
///
/// Handlers receive the notification by reference because the same value is
/// shared by every handler registered for it.
///
/// # Example
///
/// ```
/// use hermes_core::{HermesResult, Notification, NotificationHandler, RequestContext};
///
/// struct OrderShipped {
///     order_id: u64,
/// }
///
/// impl Notification for OrderShipped {}
///
/// struct EmailCustomer;
///
/// impl NotificationHandler<OrderShipped> for EmailCustomer {
///     async fn handle(&self, event: &OrderShipped, _ctx: &RequestContext) -> HermesResult<()> {
///         let _ = event.order_id;
///         Ok(())
///     }
/// }
/// ```
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    /// Handles the notification.
    ///
    /// # Errors
    ///
    /// A failure is isolated to this handler; the publisher still invokes the
    /// remaining handlers and reports every failure together.
    fn handle(
        &self,
        notification: &N,
        ctx: &RequestContext,
    ) -> impl Future<Output = HermesResult<()>> + Send;
}

/// A type-erased notification handler stored in the registry.
pub trait ErasedNotificationHandler: Send + Sync + 'static {
    /// Returns the handler's type name.
    fn handler_name(&self) -> &'static str;

    /// Handles a type-erased notification.
    ///
    /// A notification of the wrong type is ignored.
    fn handle_erased<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, HermesResult<()>>;
}

pub(crate) struct TypedNotificationHandler<N, H> {
    handler: H,
    _phantom: PhantomData<fn(&N)>,
}

impl<N, H> TypedNotificationHandler<N, H> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<N, H> ErasedNotificationHandler for TypedNotificationHandler<N, H>
where
    N: Notification,
    H: NotificationHandler<N>,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn handle_erased<'a>(
        &'a self,
        notification: &'a (dyn Any + Send + Sync),
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, HermesResult<()>> {
        Box::pin(async move {
            match notification.downcast_ref::<N>() {
                Some(notification) => self.handler.handle(notification, ctx).await,
                None => Ok(()),
            }
        })
    }
}

/// How the publisher invokes the handlers of one notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    /// One after another, in registration order.
    #[default]
    Sequential,
    /// All handler futures polled together on the caller's task.
    Concurrent,
}

impl PublishStrategy {
    /// Returns the configuration name of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for PublishStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("unknown publish strategy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HermesError;

    struct Pinged(u32);
    impl Notification for Pinged {}

    struct Other;
    impl Notification for Other {}

    struct RejectOdd;

    impl NotificationHandler<Pinged> for RejectOdd {
        async fn handle(&self, event: &Pinged, _ctx: &RequestContext) -> HermesResult<()> {
            if event.0 % 2 == 1 {
                Err(HermesError::fault("odd ping"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_erased_handler_dispatches_by_type() {
        let erased = TypedNotificationHandler::<Pinged, _>::new(RejectOdd);
        let ctx = RequestContext::new();

        assert!(erased.handle_erased(&Pinged(2), &ctx).await.is_ok());
        assert!(erased.handle_erased(&Pinged(3), &ctx).await.is_err());
        assert!(erased.handle_erased(&Other, &ctx).await.is_ok());
        assert!(erased.handler_name().ends_with("RejectOdd"));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("sequential".parse(), Ok(PublishStrategy::Sequential));
        assert_eq!("Concurrent".parse(), Ok(PublishStrategy::Concurrent));
        assert!("parallel".parse::<PublishStrategy>().is_err());
        assert_eq!(PublishStrategy::default(), PublishStrategy::Sequential);
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&PublishStrategy::Concurrent).expect("serialize");
        assert_eq!(json, "\"concurrent\"");
    }
}
