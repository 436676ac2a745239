//! Type-keyed handler registration.
//!
//! Handlers are registered once at startup through [`RegistryBuilder`] and
//! frozen into an immutable [`HandlerRegistry`]. Lookups are plain `HashMap`
//! reads keyed by the request's `TypeId`; nothing is locked after `build()`.
//!
//! # Example
//!
//! ```
//! use hermes_core::{Handler, HermesResult, Request, RequestContext, RegistryBuilder};
//!
//! struct CountQuery;
//! impl Request for CountQuery {
//!     type Response = usize;
//! }
//!
//! struct CountHandler;
//! impl Handler<CountQuery> for CountHandler {
//!     async fn handle(&self, _req: CountQuery, _ctx: &RequestContext) -> HermesResult<usize> {
//!         Ok(7)
//!     }
//! }
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register::<CountQuery, _>(CountHandler).unwrap();
//! let registry = builder.build();
//!
//! assert!(registry.contains::<CountQuery>());
//! assert!(registry.resolve::<CountQuery>().is_ok());
//! ```

use crate::error::{HermesError, HermesResult};
use crate::handler::{ErasedHandler, FactoryHandler, Handler, TypedHandler};
use crate::notification::{
    ErasedNotificationHandler, Notification, NotificationHandler, TypedNotificationHandler,
};
use crate::request::Request;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct HandlerEntry {
    request_type: &'static str,
    handler: Arc<dyn ErasedHandler>,
}

/// A bundle of registrations applied as one unit.
///
/// Modules let a feature area register all of its handlers in one place:
///
/// ```
/// use hermes_core::{HandlerModule, HermesResult, RegistryBuilder};
///
/// struct BillingModule;
///
/// impl HandlerModule for BillingModule {
///     fn register(&self, builder: &mut RegistryBuilder) -> HermesResult<()> {
///         // builder.register::<ChargeCommand, _>(ChargeHandler::new())?;
///         let _ = builder;
///         Ok(())
///     }
/// }
/// ```
pub trait HandlerModule {
    /// Registers this module's handlers.
    ///
    /// # Errors
    ///
    /// Propagates any registration error, such as a duplicate handler.
    fn register(&self, builder: &mut RegistryBuilder) -> HermesResult<()>;
}

/// Collects handler registrations.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<TypeId, HandlerEntry>,
    notification_handlers: HashMap<TypeId, Vec<Arc<dyn ErasedNotificationHandler>>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared handler instance for request type `R`.
    ///
    /// # Errors
    ///
    /// Returns [`HermesError::Configuration`] if `R` already has a handler.
    pub fn register<R, H>(&mut self, handler: H) -> HermesResult<()>
    where
        R: Request,
        H: Handler<R>,
    {
        self.insert::<R>(Arc::new(TypedHandler::<R, H>::new(handler)))
    }

    /// Registers a factory that builds a fresh handler for every dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`HermesError::Configuration`] if `R` already has a handler.
    pub fn register_factory<R, H, F>(&mut self, factory: F) -> HermesResult<()>
    where
        R: Request,
        H: Handler<R>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert::<R>(Arc::new(FactoryHandler::<R, H, F>::new(factory)))
    }

    fn insert<R: Request>(&mut self, handler: Arc<dyn ErasedHandler>) -> HermesResult<()> {
        let request_type = type_name::<R>();
        if let Some(existing) = self.handlers.get(&TypeId::of::<R>()) {
            return Err(HermesError::configuration(format!(
                "ambiguous handler for {request_type}: {} is already registered, cannot add {}",
                existing.handler.handler_name(),
                handler.handler_name()
            )));
        }

        tracing::debug!(
            request_type,
            handler = handler.handler_name(),
            "Registered request handler"
        );
        self.handlers.insert(
            TypeId::of::<R>(),
            HandlerEntry {
                request_type,
                handler,
            },
        );
        Ok(())
    }

    /// Appends a handler for notification type `N`.
    ///
    /// Any number of handlers may be registered for the same notification;
    /// they are invoked in registration order.
    pub fn register_notification_handler<N, H>(&mut self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N>,
    {
        let handler: Arc<dyn ErasedNotificationHandler> =
            Arc::new(TypedNotificationHandler::<N, H>::new(handler));
        tracing::debug!(
            notification_type = type_name::<N>(),
            handler = handler.handler_name(),
            "Registered notification handler"
        );
        self.notification_handlers
            .entry(TypeId::of::<N>())
            .or_default()
            .push(handler);
    }

    /// Applies a [`HandlerModule`].
    ///
    /// # Errors
    ///
    /// Propagates the module's first registration error.
    pub fn module<M: HandlerModule + ?Sized>(&mut self, module: &M) -> HermesResult<()> {
        module.register(self)
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
            notification_handlers: self.notification_handlers,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("handlers", &self.handlers.len())
            .field("notification_types", &self.notification_handlers.len())
            .finish()
    }
}

/// Immutable map from request and notification types to their handlers.
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, HandlerEntry>,
    notification_handlers: HashMap<TypeId, Vec<Arc<dyn ErasedNotificationHandler>>>,
}

impl HandlerRegistry {
    /// Returns an empty registry builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Resolves the single handler for request type `R`.
    ///
    /// # Errors
    ///
    /// Returns [`HermesError::HandlerNotFound`] if nothing is registered.
    pub fn resolve<R: Request>(&self) -> HermesResult<Arc<dyn ErasedHandler>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or(HermesError::HandlerNotFound {
                request_type: type_name::<R>(),
            })
    }

    /// Returns every handler for notification type `N`, in registration
    /// order. Empty when none are registered.
    #[must_use]
    pub fn resolve_notification_handlers<N: Notification>(
        &self,
    ) -> &[Arc<dyn ErasedNotificationHandler>] {
        self.notification_handlers
            .get(&TypeId::of::<N>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` if request type `R` has a handler.
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Returns the number of registered request handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Returns the number of handlers registered for notification type `N`.
    #[must_use]
    pub fn notification_handler_count<N: Notification>(&self) -> usize {
        self.resolve_notification_handlers::<N>().len()
    }

    /// Returns the names of all request types with a handler, sorted.
    #[must_use]
    pub fn registered_request_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.values().map(|e| e.request_type).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("request_types", &self.registered_request_types())
            .field("notification_types", &self.notification_handlers.len())
            .finish()
    }
}
