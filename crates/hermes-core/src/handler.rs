//! Handler traits for request processing.
//!
//! The [`Handler`] trait is what application code implements. The registry
//! stores handlers behind [`ErasedHandler`] so handlers for different request
//! types can live in a single map.

use crate::error::{HermesError, HermesResult};
use crate::request::Request;
use crate::{BoxFuture, RequestContext};
use std::any::{type_name, Any};
use std::future::Future;
use std::marker::PhantomData;

/// A trait for handling one typed request.
///
/// # Example
///
/// ```
/// use hermes_core::{Handler, HermesResult, Request, RequestContext};
///
/// struct GreetCommand {
///     name: String,
/// }
///
/// impl Request for GreetCommand {
///     type Response = String;
/// }
///
/// struct GreetHandler;
///
/// impl Handler<GreetCommand> for GreetHandler {
///     async fn handle(&self, request: GreetCommand, _ctx: &RequestContext) -> HermesResult<String> {
///         Ok(format!("Hello, {}!", request.name))
///     }
/// }
/// ```
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Handles the request and produces its response.
    ///
    /// # Errors
    ///
    /// Returns [`HermesError`] for faults or cancellation. Expected business
    /// failures should be expressed in the response type instead, usually
    /// through [`Outcome`](crate::Outcome).
    fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
    ) -> impl Future<Output = HermesResult<R::Response>> + Send;
}

/// A closure-based handler.
///
/// The closure receives an owned clone of the context so the returned
/// future does not borrow from the caller.
///
/// ```
/// use hermes_core::{FnHandler, HermesResult, Request, RequestContext};
///
/// struct PingQuery;
///
/// impl Request for PingQuery {
///     type Response = &'static str;
/// }
///
/// let handler = FnHandler::new(|_req: PingQuery, _ctx: RequestContext| async move {
///     HermesResult::Ok("pong")
/// });
/// ```
pub struct FnHandler<R, F, Fut> {
    func: F,
    _phantom: PhantomData<fn(R) -> Fut>,
}

impl<R, F, Fut> FnHandler<R, F, Fut>
where
    R: Request,
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HermesResult<R::Response>> + Send + 'static,
{
    /// Creates a new function-based handler.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<R, F, Fut> Handler<R> for FnHandler<R, F, Fut>
where
    R: Request,
    F: Fn(R, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HermesResult<R::Response>> + Send + 'static,
{
    async fn handle(&self, request: R, ctx: &RequestContext) -> HermesResult<R::Response> {
        (self.func)(request, ctx.clone()).await
    }
}

/// Type-erased response produced by an [`ErasedHandler`].
pub type ErasedResponse = Box<dyn Any + Send>;

/// A type-erased handler stored in the registry.
///
/// Implementations downcast the boxed request to their concrete type. A
/// mismatch is reported as [`HermesError::Internal`] since the registry keys
/// handlers by the request's `TypeId`.
pub trait ErasedHandler: Send + Sync + 'static {
    /// Returns the handler's type name, used in logs.
    fn handler_name(&self) -> &'static str;

    /// Handles a boxed request and returns a boxed response.
    fn handle_erased<'a>(
        &'a self,
        request: Box<dyn Any + Send>,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, HermesResult<ErasedResponse>>;
}

fn downcast_request<R: Request>(request: Box<dyn Any + Send>) -> HermesResult<R> {
    request.downcast::<R>().map(|boxed| *boxed).map_err(|_| {
        HermesError::internal(format!(
            "request type mismatch: expected {}",
            type_name::<R>()
        ))
    })
}

/// Adapts a shared handler instance to [`ErasedHandler`].
pub(crate) struct TypedHandler<R, H> {
    handler: H,
    _phantom: PhantomData<fn(R)>,
}

impl<R, H> TypedHandler<R, H> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<R, H> ErasedHandler for TypedHandler<R, H>
where
    R: Request,
    H: Handler<R>,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn handle_erased<'a>(
        &'a self,
        request: Box<dyn Any + Send>,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, HermesResult<ErasedResponse>> {
        Box::pin(async move {
            let request = downcast_request::<R>(request)?;
            let response = self.handler.handle(request, ctx).await?;
            Ok(Box::new(response) as ErasedResponse)
        })
    }
}

/// Adapts a handler factory to [`ErasedHandler`]; one handler per dispatch.
pub(crate) struct FactoryHandler<R, H, F> {
    factory: F,
    _phantom: PhantomData<fn(R) -> H>,
}

impl<R, H, F> FactoryHandler<R, H, F> {
    pub(crate) const fn new(factory: F) -> Self {
        Self {
            factory,
            _phantom: PhantomData,
        }
    }
}

impl<R, H, F> ErasedHandler for FactoryHandler<R, H, F>
where
    R: Request,
    H: Handler<R>,
    F: Fn() -> H + Send + Sync + 'static,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn handle_erased<'a>(
        &'a self,
        request: Box<dyn Any + Send>,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, HermesResult<ErasedResponse>> {
        let handler = (self.factory)();
        Box::pin(async move {
            let request = downcast_request::<R>(request)?;
            let response = handler.handle(request, ctx).await?;
            Ok(Box::new(response) as ErasedResponse)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct AddCommand {
        a: i32,
        b: i32,
    }

    impl Request for AddCommand {
        type Response = i32;
    }

    struct AddHandler;

    impl Handler<AddCommand> for AddHandler {
        async fn handle(&self, request: AddCommand, _ctx: &RequestContext) -> HermesResult<i32> {
            Ok(request.a + request.b)
        }
    }

    #[tokio::test]
    async fn test_handler_impl() {
        let ctx = RequestContext::new();
        let sum = AddHandler
            .handle(AddCommand { a: 2, b: 3 }, &ctx)
            .await
            .expect("handler should succeed");
        assert_eq!(sum, 5);
    }

    #[tokio::test]
    async fn test_fn_handler_sees_context() {
        let ctx = RequestContext::new();
        let expected = ctx.request_id();
        let handler = FnHandler::new(move |req: AddCommand, ctx: RequestContext| async move {
            assert_eq!(ctx.request_id(), expected);
            Ok(req.a * req.b)
        });

        let product = handler
            .handle(AddCommand { a: 4, b: 5 }, &ctx)
            .await
            .expect("handler should succeed");
        assert_eq!(product, 20);
    }

    #[tokio::test]
    async fn test_typed_handler_erases_and_restores() {
        let erased: Box<dyn ErasedHandler> = Box::new(TypedHandler::<AddCommand, _>::new(AddHandler));
        assert!(erased.handler_name().ends_with("AddHandler"));

        let ctx = RequestContext::new();
        let response = erased
            .handle_erased(Box::new(AddCommand { a: 1, b: 1 }), &ctx)
            .await
            .expect("handler should succeed");
        assert_eq!(*response.downcast::<i32>().expect("i32 response"), 2);
    }

    #[tokio::test]
    async fn test_wrong_request_type_is_internal_error() {
        let erased = TypedHandler::<AddCommand, _>::new(AddHandler);
        let ctx = RequestContext::new();

        let err = erased
            .handle_erased(Box::new("not a command"), &ctx)
            .await
            .expect_err("mismatch should fail");
        assert!(matches!(err, HermesError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_factory_builds_one_handler_per_dispatch() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let erased = FactoryHandler::<AddCommand, AddHandler, _>::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            AddHandler
        });

        let ctx = RequestContext::new();
        for _ in 0..3 {
            erased
                .handle_erased(Box::new(AddCommand { a: 0, b: 0 }), &ctx)
                .await
                .expect("handler should succeed");
        }
        assert_eq!(built.load(Ordering::SeqCst), 3);
    }
}
