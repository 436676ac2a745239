//! The mediator: handler resolution, pipeline dispatch and publishing.
//!
//! ```text
//! send(R) → resolve handler for R → PipelineContext → behaviors → handler → downcast
//! publish(N) → resolve handlers for N → NotificationPublisher
//! ```
//!
//! A missing handler fails with [`HermesError::HandlerNotFound`] before any
//! behavior runs. Notifications are not wrapped by the pipeline.

use crate::publisher::NotificationPublisher;
use hermes_config::HermesConfig;
use hermes_core::envelope::downcast_response;
use hermes_core::{
    CancellationToken, Handler, HandlerModule, HandlerRegistry, HermesError, HermesResult,
    Notification, NotificationHandler, PublishStrategy, RegistryBuilder, Request, RequestContext,
    RequestDescriptor, RequestEnvelope,
};
use hermes_pipeline::{
    Behavior, BoxedBehavior, CacheStore, Clock, Pipeline, PipelineBuilder, PipelineContext,
    PipelineSettings, Stage,
};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Dispatches requests to their handlers and notifications to their
/// subscribers.
///
/// Cheap to clone; every clone shares the same registry and pipeline.
///
/// # Example
///
/// ```
/// use hermes::prelude::*;
///
/// struct PingQuery;
///
/// impl Request for PingQuery {
///     type Response = &'static str;
/// }
///
/// struct PingHandler;
///
/// impl Handler<PingQuery> for PingHandler {
///     async fn handle(&self, _query: PingQuery, _ctx: &RequestContext) -> HermesResult<&'static str> {
///         Ok("pong")
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let mediator = Mediator::builder()
///     .register::<PingQuery, _>(PingHandler)
///     .standard_behaviors(&PipelineSettings::default())
///     .build()?;
///
/// let reply = mediator.send(PingQuery, CancellationToken::new()).await?;
/// assert_eq!(reply, "pong");
/// # Ok::<(), HermesError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<MediatorInner>,
}

struct MediatorInner {
    registry: HandlerRegistry,
    pipeline: Pipeline,
    publisher: NotificationPublisher,
}

impl Mediator {
    /// Creates a new mediator builder.
    #[must_use]
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Sends a request to its handler through the pipeline.
    ///
    /// # Errors
    ///
    /// - [`HermesError::HandlerNotFound`] if no handler is registered for `R`
    /// - Whatever the pipeline or handler returns
    pub async fn send<R: Request>(
        &self,
        request: R,
        cancellation: CancellationToken,
    ) -> HermesResult<R::Response> {
        self.send_with_context(request, RequestContext::with_cancellation(cancellation))
            .await
    }

    /// Sends a request with a caller-supplied context.
    ///
    /// Use this to correlate the dispatch with an existing request ID.
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::send`].
    pub async fn send_with_context<R: Request>(
        &self,
        request: R,
        ctx: RequestContext,
    ) -> HermesResult<R::Response> {
        let handler = match self.inner.registry.resolve::<R>() {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    request_type = type_name::<R>(),
                    "No handler registered for request"
                );
                return Err(e);
            }
        };

        let descriptor = RequestDescriptor::of::<R>(handler.handler_name());
        let span = tracing::debug_span!(
            "hermes.send",
            request_id = %ctx.request_id(),
            request_type = descriptor.short_request_type(),
            request_kind = %descriptor.kind,
        );

        async move {
            let envelope = RequestEnvelope::new(request, descriptor.handler_name);
            let mut pipeline_ctx = PipelineContext::new(ctx, descriptor);
            let response = self
                .inner
                .pipeline
                .process(&mut pipeline_ctx, envelope, handler)
                .await?;
            downcast_response::<R::Response>(response, descriptor.request_type)
        }
        .instrument(span)
        .await
    }

    /// Sends a command that produces no value.
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::send`].
    pub async fn execute<R>(&self, command: R, cancellation: CancellationToken) -> HermesResult<()>
    where
        R: Request<Response = ()>,
    {
        self.send(command, cancellation).await
    }

    /// Publishes a notification to every registered handler.
    ///
    /// # Errors
    ///
    /// - [`HermesError::Cancelled`] on cancellation
    /// - [`HermesError::Publish`] if any handler failed
    pub async fn publish<N: Notification>(
        &self,
        notification: N,
        cancellation: CancellationToken,
    ) -> HermesResult<()> {
        self.publish_with_context(notification, RequestContext::with_cancellation(cancellation))
            .await
    }

    /// Publishes a notification with a caller-supplied context.
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::publish`].
    pub async fn publish_with_context<N: Notification>(
        &self,
        notification: N,
        ctx: RequestContext,
    ) -> HermesResult<()> {
        let handlers = self.inner.registry.resolve_notification_handlers::<N>();
        let span = tracing::debug_span!(
            "hermes.publish",
            request_id = %ctx.request_id(),
            notification_type = type_name::<N>(),
        );

        self.inner
            .publisher
            .publish(handlers, &notification, &ctx)
            .instrument(span)
            .await
    }

    /// Returns the handler registry.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    /// Returns the behavior pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Returns the notification publishing strategy.
    #[must_use]
    pub fn notification_strategy(&self) -> PublishStrategy {
        self.inner.publisher.strategy()
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("handlers", &self.inner.registry.handler_count())
            .field("pipeline", &self.inner.pipeline)
            .field("notification_strategy", &self.notification_strategy())
            .finish()
    }
}

/// Builder for [`Mediator`]; the composition root.
///
/// Registration errors are collected and the first one is returned from
/// [`MediatorBuilder::build`].
#[must_use]
pub struct MediatorBuilder {
    registry: RegistryBuilder,
    pipeline: PipelineBuilder,
    strategy: PublishStrategy,
    errors: Vec<HermesError>,
}

impl MediatorBuilder {
    /// Creates an empty builder with no behaviors.
    pub fn new() -> Self {
        Self {
            registry: RegistryBuilder::new(),
            pipeline: PipelineBuilder::new(),
            strategy: PublishStrategy::default(),
            errors: Vec::new(),
        }
    }

    /// Registers the handler for request type `R`.
    pub fn register<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        if let Err(e) = self.registry.register::<R, H>(handler) {
            self.errors.push(e);
        }
        self
    }

    /// Registers a factory that builds a fresh handler per dispatch.
    pub fn register_factory<R, H, F>(mut self, factory: F) -> Self
    where
        R: Request,
        H: Handler<R>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        if let Err(e) = self.registry.register_factory::<R, H, F>(factory) {
            self.errors.push(e);
        }
        self
    }

    /// Adds a handler for notification type `N`.
    pub fn register_notification_handler<N, H>(mut self, handler: H) -> Self
    where
        N: Notification,
        H: NotificationHandler<N>,
    {
        self.registry.register_notification_handler::<N, H>(handler);
        self
    }

    /// Applies a [`HandlerModule`].
    pub fn module<M: HandlerModule>(mut self, module: &M) -> Self {
        if let Err(e) = self.registry.module(module) {
            self.errors.push(e);
        }
        self
    }

    /// Appends a custom behavior after those already added.
    pub fn behavior<B: Behavior>(mut self, behavior: B) -> Self {
        self.pipeline = self.pipeline.behavior(behavior);
        self
    }

    /// Appends a shared custom behavior.
    pub fn boxed_behavior(mut self, behavior: BoxedBehavior) -> Self {
        self.pipeline = self.pipeline.boxed(behavior);
        self
    }

    /// Appends one built-in stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.pipeline = self.pipeline.stage(stage);
        self
    }

    /// Appends the built-in stages in canonical order and applies `settings`.
    pub fn standard_behaviors(mut self, settings: &PipelineSettings) -> Self {
        self.pipeline = self.pipeline.standard_stages().settings(settings.clone());
        self
    }

    /// Uses `store` for the caching stage instead of the in-memory default.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.pipeline = self.pipeline.cache_store(store);
        self
    }

    /// Uses `clock` for cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.pipeline = self.pipeline.clock(clock);
        self
    }

    /// Sets how notification handlers are invoked.
    pub fn notification_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Appends the configured stages and applies the configured settings
    /// and notification strategy.
    pub fn from_config(mut self, config: &HermesConfig) -> Self {
        self.pipeline = self
            .pipeline
            .stages(config.pipeline.behaviors.iter().copied())
            .settings(config.to_pipeline_settings());
        self.strategy = config.notifications.strategy;
        self
    }

    /// Builds the mediator.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, typically
    /// [`HermesError::Configuration`] for a request type registered twice.
    pub fn build(self) -> HermesResult<Mediator> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let registry = self.registry.build();
        let pipeline = self.pipeline.build();

        tracing::info!(
            handlers = registry.handler_count(),
            behaviors = ?pipeline.behavior_names(),
            notification_strategy = %self.strategy,
            "Mediator built"
        );

        Ok(Mediator {
            inner: Arc::new(MediatorInner {
                registry,
                pipeline,
                publisher: NotificationPublisher::new(self.strategy),
            }),
        })
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorBuilder")
            .field("strategy", &self.strategy)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
