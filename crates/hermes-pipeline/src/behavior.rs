//! Core behavior trait and types.
//!
//! A [`Behavior`] wraps the handler invocation of every request it applies
//! to. It receives the mutable [`PipelineContext`], the type-erased
//! [`RequestEnvelope`] and a [`Next`] continuation for the rest of the chain.
//!
//! A behavior may:
//! - call `next` once and return its result unchanged (observe)
//! - call `next` once and inspect, replace or wrap the result (transform)
//! - never call `next` and return its own result (short-circuit)
//!
//! # Example
//!
//! ```
//! use hermes_core::{BoxFuture, RequestEnvelope};
//! use hermes_pipeline::behavior::{Behavior, Next, PipelineResult};
//! use hermes_pipeline::context::PipelineContext;
//!
//! struct Audit;
//!
//! impl Behavior for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut PipelineContext,
//!         request: RequestEnvelope,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, PipelineResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(ok = result.is_ok(), "audited");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::PipelineContext;
use hermes_core::{BoxFuture, ErasedResponse, HermesResult, RequestDescriptor, RequestEnvelope};
use std::future::Future;

/// The result flowing back out of the chain.
pub type PipelineResult = HermesResult<ErasedResponse>;

/// A cross-cutting step around handler invocation.
///
/// # Invariants
///
/// - A behavior calls `next.run()` at most once
/// - Errors from `next` are returned unchanged unless the behavior's job is
///   to translate them
pub trait Behavior: Send + Sync + 'static {
    /// Returns the behavior's name, used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if this behavior should wrap the described request.
    ///
    /// Behaviors that do not apply are left out of the chain entirely.
    fn applies_to(&self, descriptor: &RequestDescriptor) -> bool {
        let _ = descriptor;
        true
    }

    /// Processes the request through this behavior.
    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult>;
}

/// Continuation that runs the rest of the chain.
///
/// Consumed by [`Next::run`], so it can be invoked at most once. Dropping it
/// without running short-circuits the pipeline.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

/// The terminal link of the chain.
///
/// The returned future is `'static` so it cannot borrow the context; the
/// handler receives its own clone of the [`RequestContext`](hermes_core::RequestContext).
pub type Terminal<'a> = Box<
    dyn FnOnce(&mut PipelineContext, RequestEnvelope) -> BoxFuture<'static, PipelineResult>
        + Send
        + 'a,
>;

enum NextInner<'a> {
    /// Another behavior, then the rest of the chain.
    Chain {
        behavior: &'a dyn Behavior,
        next: Box<Next<'a>>,
    },
    /// End of chain: invoke the handler.
    Handler(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Creates a link that runs `behavior` before `next`.
    pub(crate) fn new(behavior: &'a dyn Behavior, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                behavior,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal link.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut PipelineContext, RequestEnvelope) -> BoxFuture<'static, PipelineResult>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next behavior or the handler.
    pub async fn run(self, ctx: &mut PipelineContext, request: RequestEnvelope) -> PipelineResult {
        match self.inner {
            NextInner::Chain { behavior, next } => behavior.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A behavior built from a closure.
///
/// The closure receives the same arguments as [`Behavior::process`] and
/// returns the boxed future, usually through [`boxed`].
///
/// ```
/// use hermes_pipeline::behavior::{boxed, FnBehavior};
///
/// let noop = FnBehavior::new("noop", |ctx, request, next| {
///     boxed(async move { next.run(ctx, request).await })
/// });
/// ```
pub struct FnBehavior<F> {
    name: &'static str,
    func: F,
}

impl<F> FnBehavior<F>
where
    F: for<'a> Fn(&'a mut PipelineContext, RequestEnvelope, Next<'a>) -> BoxFuture<'a, PipelineResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based behavior.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Behavior for FnBehavior<F>
where
    F: for<'a> Fn(&'a mut PipelineContext, RequestEnvelope, Next<'a>) -> BoxFuture<'a, PipelineResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        (self.func)(ctx, request, next)
    }
}

/// Wraps a future so it satisfies [`BoxFuture`].
pub fn boxed<'a, F>(future: F) -> BoxFuture<'a, PipelineResult>
where
    F: Future<Output = PipelineResult> + Send + 'a,
{
    Box::pin(future)
}
