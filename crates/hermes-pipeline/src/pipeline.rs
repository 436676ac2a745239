//! Ordered behavior pipeline.
//!
//! A [`Pipeline`] holds behaviors in registration order. For each dispatch
//! it keeps the behaviors that apply to the request and nests them around
//! the handler, first-registered outermost:
//!
//! ```text
//! B1( B2( ... Bn( handler ) ... ) )
//! ```
//!
//! ## Standard Stages
//!
//! The built-in behaviors and their canonical order:
//!
//! 1. **Exception handling** - Wrap faults, contain panics, single error log
//! 2. **Logging** - Log completion with elapsed time
//! 3. **Performance** - Time the request, flag slow requests
//! 4. **Validation** - Reject invalid requests before the handler
//! 5. **Caching** - Serve repeated queries from the cache store

use crate::behavior::{Behavior, Next, PipelineResult};
use crate::behaviors::{
    CachingBehavior, ExceptionHandlingBehavior, LoggingBehavior, PerformanceBehavior,
    ValidationBehavior,
};
use crate::cache::{CacheStore, Clock, MemoryCacheStore, SystemClock, DEFAULT_MAX_ENTRIES};
use crate::context::PipelineContext;
use hermes_core::handler::ErasedHandler;
use hermes_core::{BoxFuture, RequestEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// A type-erased behavior that can be stored in a vector.
pub type BoxedBehavior = Arc<dyn Behavior>;

/// The built-in behaviors, ordered outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Fault wrapping and panic containment
    ExceptionHandling = 1,
    /// Stage 2: Completion logging
    Logging = 2,
    /// Stage 3: Timing and slow-request detection
    Performance = 3,
    /// Stage 4: Request validation
    Validation = 4,
    /// Stage 5: Query response caching
    Caching = 5,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExceptionHandling => "exception_handling",
            Self::Logging => "logging",
            Self::Performance => "performance",
            Self::Validation => "validation",
            Self::Caching => "caching",
        }
    }

    /// Returns all stages in canonical order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::ExceptionHandling,
            Self::Logging,
            Self::Performance,
            Self::Validation,
            Self::Caching,
        ]
    }

    /// Returns the canonical behavior order.
    #[must_use]
    pub fn canonical() -> Vec<Stage> {
        Self::all().to_vec()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pipeline stage '{s}'"))
    }
}

/// Tuning for the built-in behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Requests slower than this are logged as slow.
    pub slow_request_threshold: Duration,
    /// Whether the exception behavior converts panics into errors.
    pub catch_panics: bool,
    /// Whether the caching stage is installed at all.
    pub cache_enabled: bool,
    /// TTL for cacheable requests that do not set their own.
    pub default_cache_ttl: Duration,
    /// Capacity of the default in-memory cache store.
    pub max_cache_entries: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            slow_request_threshold: Duration::from_millis(500),
            catch_panics: true,
            cache_enabled: true,
            default_cache_ttl: Duration::from_secs(300),
            max_cache_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// The behavior pipeline.
///
/// Immutable after [`PipelineBuilder::build`]; share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use hermes_pipeline::pipeline::{Pipeline, Stage};
///
/// let pipeline = Pipeline::builder().standard_stages().build();
/// assert_eq!(
///     pipeline.behavior_names(),
///     vec!["exception_handling", "logging", "performance", "validation", "caching"]
/// );
/// ```
pub struct Pipeline {
    behaviors: Vec<BoxedBehavior>,
    cache_store: Option<Arc<dyn CacheStore>>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through the applicable behaviors and its handler.
    pub async fn process(
        &self,
        ctx: &mut PipelineContext,
        request: RequestEnvelope,
        handler: Arc<dyn ErasedHandler>,
    ) -> PipelineResult {
        self.process_with(ctx, request, move |ctx, request| {
            let request_ctx = ctx.request_context().clone();
            Box::pin(async move {
                handler
                    .handle_erased(request.into_payload(), &request_ctx)
                    .await
            })
        })
        .await
    }

    /// Runs a request through the applicable behaviors and a custom terminal.
    pub async fn process_with<H>(
        &self,
        ctx: &mut PipelineContext,
        request: RequestEnvelope,
        handler: H,
    ) -> PipelineResult
    where
        H: FnOnce(&mut PipelineContext, RequestEnvelope) -> BoxFuture<'static, PipelineResult>
            + Send,
    {
        let next = self.build_chain(ctx, handler);
        next.run(ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, ctx: &PipelineContext, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut PipelineContext, RequestEnvelope) -> BoxFuture<'static, PipelineResult>
            + Send
            + 'a,
    {
        let descriptor = ctx.descriptor();
        let mut next = Next::handler(handler);

        for behavior in self.behaviors.iter().rev() {
            if behavior.applies_to(descriptor) {
                next = Next::new(behavior.as_ref(), next);
            }
        }

        next
    }

    /// Returns the names of all behaviors in order.
    #[must_use]
    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    /// Returns the number of behaviors.
    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Returns the cache store used by the caching stage, if installed.
    #[must_use]
    pub fn cache_store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache_store.as_ref()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("behaviors", &self.behavior_names())
            .finish_non_exhaustive()
    }
}

enum Pending {
    Stage(Stage),
    Custom(BoxedBehavior),
}

/// Builder for constructing a [`Pipeline`].
///
/// Stages and custom behaviors keep the order they were added in. Standard
/// stages are materialized at [`build`](Self::build), once the settings,
/// cache store and clock are known.
pub struct PipelineBuilder {
    entries: Vec<Pending>,
    settings: PipelineSettings,
    cache_store: Option<Arc<dyn CacheStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            settings: PipelineSettings::default(),
            cache_store: None,
            clock: None,
        }
    }

    /// Appends a custom behavior.
    #[must_use]
    pub fn behavior<B: Behavior>(self, behavior: B) -> Self {
        self.boxed(Arc::new(behavior))
    }

    /// Appends an already shared behavior.
    #[must_use]
    pub fn boxed(mut self, behavior: BoxedBehavior) -> Self {
        self.entries.push(Pending::Custom(behavior));
        self
    }

    /// Appends one built-in stage.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.entries.push(Pending::Stage(stage));
        self
    }

    /// Appends several built-in stages, in the given order.
    #[must_use]
    pub fn stages<I: IntoIterator<Item = Stage>>(mut self, stages: I) -> Self {
        self.entries.extend(stages.into_iter().map(Pending::Stage));
        self
    }

    /// Appends every built-in stage in canonical order.
    #[must_use]
    pub fn standard_stages(self) -> Self {
        self.stages(Stage::all())
    }

    /// Sets the tuning for built-in stages.
    #[must_use]
    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `store` for the caching stage instead of a fresh in-memory store.
    #[must_use]
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Sets the clock for the default in-memory cache store.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let Self {
            entries,
            settings,
            cache_store,
            clock,
        } = self;

        let wants_cache = settings.cache_enabled
            && entries
                .iter()
                .any(|entry| matches!(entry, Pending::Stage(Stage::Caching)));

        let cache_store = wants_cache.then(|| {
            cache_store.unwrap_or_else(|| {
                let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
                Arc::new(MemoryCacheStore::with_clock(settings.max_cache_entries, clock))
                    as Arc<dyn CacheStore>
            })
        });

        let mut behaviors: Vec<BoxedBehavior> = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Pending::Custom(behavior) => behaviors.push(behavior),
                Pending::Stage(stage) => {
                    if let Some(behavior) = standard_behavior(stage, &settings, cache_store.as_ref())
                    {
                        behaviors.push(behavior);
                    } else {
                        tracing::debug!(stage = stage.name(), "Pipeline stage disabled");
                    }
                }
            }
        }

        Pipeline {
            behaviors,
            cache_store,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn standard_behavior(
    stage: Stage,
    settings: &PipelineSettings,
    cache_store: Option<&Arc<dyn CacheStore>>,
) -> Option<BoxedBehavior> {
    let behavior: BoxedBehavior = match stage {
        Stage::ExceptionHandling => Arc::new(ExceptionHandlingBehavior::new(settings.catch_panics)),
        Stage::Logging => Arc::new(LoggingBehavior::new()),
        Stage::Performance => Arc::new(PerformanceBehavior::new(settings.slow_request_threshold)),
        Stage::Validation => Arc::new(ValidationBehavior::new()),
        Stage::Caching => Arc::new(CachingBehavior::new(
            Arc::clone(cache_store?),
            settings.default_cache_ttl,
        )),
    };
    Some(behavior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use hermes_core::{ErasedResponse, Request, RequestDescriptor, RequestKind};
    use parking_lot::Mutex;

    struct PingQuery;

    impl Request for PingQuery {
        type Response = u8;
    }

    struct OrderTracking {
        name: &'static str,
        order: Arc<Mutex<Vec<String>>>,
        only: Option<RequestKind>,
    }

    impl Behavior for OrderTracking {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applies_to(&self, descriptor: &RequestDescriptor) -> bool {
            self.only.map_or(true, |kind| kind == descriptor.kind)
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut PipelineContext,
            request: RequestEnvelope,
            next: Next<'a>,
        ) -> BoxFuture<'a, PipelineResult> {
            Box::pin(async move {
                self.order.lock().push(format!("{}:before", self.name));
                let result = next.run(ctx, request).await;
                self.order.lock().push(format!("{}:after", self.name));
                result
            })
        }
    }

    fn tracking(
        name: &'static str,
        order: &Arc<Mutex<Vec<String>>>,
        only: Option<RequestKind>,
    ) -> OrderTracking {
        OrderTracking {
            name,
            order: Arc::clone(order),
            only,
        }
    }

    async fn run(pipeline: &Pipeline, kind: RequestKind, order: &Arc<Mutex<Vec<String>>>) {
        let mut ctx = test_context("tests::PingQuery", kind);
        let order = Arc::clone(order);
        pipeline
            .process_with(&mut ctx, RequestEnvelope::new(PingQuery, "h"), move |_, _| {
                order.lock().push("handler".to_string());
                Box::pin(async { Ok(Box::new(1_u8) as ErasedResponse) })
            })
            .await
            .expect("pipeline result");
    }

    #[tokio::test]
    async fn test_behaviors_nest_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .behavior(tracking("first", &order, None))
            .behavior(tracking("second", &order, None))
            .build();

        run(&pipeline, RequestKind::Query, &order).await;

        assert_eq!(
            *order.lock(),
            vec![
                "first:before",
                "second:before",
                "handler",
                "second:after",
                "first:after"
            ]
        );
    }

    #[tokio::test]
    async fn test_non_applicable_behaviors_are_skipped() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .behavior(tracking("queries", &order, Some(RequestKind::Query)))
            .behavior(tracking("all", &order, None))
            .build();

        run(&pipeline, RequestKind::Command, &order).await;

        assert_eq!(*order.lock(), vec!["all:before", "handler", "all:after"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_handler() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder().build();
        run(&pipeline, RequestKind::Query, &order).await;
        assert_eq!(*order.lock(), vec!["handler"]);
        assert_eq!(pipeline.behavior_count(), 0);
    }

    #[test]
    fn test_custom_behaviors_keep_position_between_stages() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(Stage::Logging)
            .behavior(tracking("audit", &order, None))
            .stage(Stage::Validation)
            .build();

        assert_eq!(pipeline.behavior_names(), vec!["logging", "audit", "validation"]);
        assert!(pipeline.cache_store().is_none());
    }

    #[test]
    fn test_disabled_cache_drops_caching_stage() {
        let pipeline = Pipeline::builder()
            .standard_stages()
            .settings(PipelineSettings {
                cache_enabled: false,
                ..PipelineSettings::default()
            })
            .build();

        assert!(!pipeline.behavior_names().contains(&"caching"));
        assert!(pipeline.cache_store().is_none());
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::ExceptionHandling < Stage::Logging);
        assert!(Stage::Logging < Stage::Performance);
        assert!(Stage::Performance < Stage::Validation);
        assert!(Stage::Validation < Stage::Caching);
        assert_eq!(Stage::canonical(), Stage::all().to_vec());
    }

    #[test]
    fn test_stage_names_round_trip() {
        for stage in Stage::all() {
            assert_eq!(stage.name().parse::<Stage>(), Ok(stage));
        }
        assert!("tracing".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_serde_uses_snake_case() {
        let json = serde_json::to_string(&Stage::ExceptionHandling).expect("serialize");
        assert_eq!(json, "\"exception_handling\"");
    }

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.slow_request_threshold, Duration::from_millis(500));
        assert!(settings.catch_panics);
        assert_eq!(settings.default_cache_ttl, Duration::from_secs(300));
    }
}
