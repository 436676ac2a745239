//! # Hermes Pipeline
//!
//! Ordered behavior pipeline for the Hermes mediator.
//!
//! Every request dispatched through the mediator passes through a chain of
//! [`Behavior`]s before reaching its handler. The chain is assembled once at
//! startup and is immutable afterwards.
//!
//! ## Pipeline Stages
//!
//! ```text
//! send → ExceptionHandling → Logging → Performance → Validation → Caching → Handler
//!                                                                             ↓
//! result ← processing failure ← log ← timing ← (short-circuit) ← (cache hit) ←┘
//! ```
//!
//! | Order | Behavior | Purpose |
//! |-------|----------|---------|
//! | 1 | Exception handling | Wrap faults into one failure type, contain panics |
//! | 2 | Logging | Start and completion logs with elapsed time |
//! | 3 | Performance | Time the request, warn when slow |
//! | 4 | Validation | Reject invalid requests before the handler |
//! | 5 | Caching | Serve repeated queries from the cache store |
//!
//! Stages can be disabled or reordered through [`PipelineBuilder`], and
//! custom behaviors can be interleaved with them.
//!
//! ## Example
//!
//! ```
//! use hermes_pipeline::{Pipeline, Stage};
//!
//! let pipeline = Pipeline::builder().standard_stages().build();
//! assert_eq!(pipeline.behavior_count(), 5);
//! assert_eq!(Stage::all()[0].name(), "exception_handling");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod behavior;
pub mod behaviors;
pub mod cache;
pub mod context;
pub mod pipeline;

// Re-export main types at crate root
pub use behavior::{boxed, Behavior, FnBehavior, Next, PipelineResult};
pub use behaviors::{
    CachingBehavior, ExceptionHandlingBehavior, LoggingBehavior, PerformanceBehavior,
    RequestTiming, ValidationBehavior,
};
pub use cache::{CacheStore, Clock, ManualClock, MemoryCacheStore, SystemClock};
pub use context::PipelineContext;
pub use pipeline::{BoxedBehavior, Pipeline, PipelineBuilder, PipelineSettings, Stage};
