//! Request contracts and optional capabilities.
//!
//! Every dispatched value implements [`Request`]. Two optional capabilities
//! are recognised by the built-in behaviors:
//!
//! - [`Validate`] - exposed through [`Request::validator`]
//! - [`Cacheable`] - exposed through [`Request::cache_directive`]
//!
//! Both are opt-in: the default implementations return `None` and the
//! corresponding behavior lets the request pass through.

use crate::validation::Validate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Whether a request changes state or only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Intent to change state.
    Command,
    /// Read-only intent, eligible for caching.
    Query,
}

impl RequestKind {
    /// Classifies a type name by the query naming convention.
    ///
    /// A type whose short name (without module path or generic arguments)
    /// ends with `Query` is a query; everything else is a command.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::RequestKind;
    ///
    /// assert_eq!(RequestKind::from_type_name("app::users::GetUserQuery"), RequestKind::Query);
    /// assert_eq!(RequestKind::from_type_name("app::users::CreateUserCommand"), RequestKind::Command);
    /// assert_eq!(RequestKind::from_type_name("app::Page<app::ListUsersQuery>"), RequestKind::Command);
    /// ```
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        let without_generics = name.split('<').next().unwrap_or(name);
        let short = without_generics.rsplit("::").next().unwrap_or(without_generics);
        if short.ends_with("Query") {
            Self::Query
        } else {
            Self::Command
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed request routed to exactly one handler.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, RequestKind};
///
/// struct GetUserQuery {
///     user_id: u64,
/// }
///
/// impl Request for GetUserQuery {
///     type Response = Option<String>;
/// }
///
/// assert_eq!(GetUserQuery::kind(), RequestKind::Query);
/// ```
pub trait Request: Send + 'static {
    /// The value produced by this request's handler.
    type Response: Send + 'static;

    /// Returns whether this request is a command or a query.
    ///
    /// Defaults to the naming convention of [`RequestKind::from_type_name`].
    fn kind() -> RequestKind
    where
        Self: Sized,
    {
        RequestKind::from_type_name(type_name::<Self>())
    }

    /// Exposes the validation capability, if this request has one.
    fn validator(&self) -> Option<&dyn Validate> {
        None
    }

    /// Exposes the caching capability, if this request has one.
    ///
    /// Implementations normally delegate to [`CacheDirective::of`].
    fn cache_directive(&self) -> Option<CacheDirective> {
        None
    }
}

/// Capability implemented by queries whose responses may be cached.
///
/// The request is serialised to compute a content hash, so two requests with
/// equal content share a cache entry.
pub trait Cacheable: Serialize {
    /// How long a response stays cached. `None` uses the configured default.
    fn cache_duration(&self) -> Option<Duration> {
        None
    }
}

/// A shared, type-erased cached response.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

type ShareFn = fn(&(dyn Any + Send)) -> Option<CachedValue>;
type RestoreFn = fn(&(dyn Any + Send + Sync)) -> Option<Box<dyn Any + Send>>;

/// Everything the caching behavior needs to cache one request's response.
///
/// Built by [`CacheDirective::of`] for a concrete request type, it captures
/// the cache key and monomorphised functions that move the response in and
/// out of the shared cache.
#[derive(Clone)]
pub struct CacheDirective {
    request_type: &'static str,
    fingerprint: String,
    ttl: Option<Duration>,
    share: ShareFn,
    restore: RestoreFn,
}

impl CacheDirective {
    /// Builds the directive for a cacheable request.
    ///
    /// Returns `None` (and logs a warning) if the request cannot be
    /// serialised, in which case the request is simply not cached.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::{CacheDirective, Cacheable, Request};
    /// use serde::Serialize;
    /// use std::time::Duration;
    ///
    /// #[derive(Serialize)]
    /// struct GetPriceQuery {
    ///     sku: String,
    /// }
    ///
    /// impl Cacheable for GetPriceQuery {
    ///     fn cache_duration(&self) -> Option<Duration> {
    ///         Some(Duration::from_secs(300))
    ///     }
    /// }
    ///
    /// impl Request for GetPriceQuery {
    ///     type Response = u64;
    ///
    ///     fn cache_directive(&self) -> Option<CacheDirective> {
    ///         CacheDirective::of(self)
    ///     }
    /// }
    ///
    /// let directive = GetPriceQuery { sku: "A1".into() }.cache_directive().unwrap();
    /// assert!(directive.key().contains("GetPriceQuery"));
    /// ```
    pub fn of<R>(request: &R) -> Option<Self>
    where
        R: Request + Cacheable,
        R::Response: Clone + Sync,
    {
        let request_type = type_name::<R>();
        let bytes = match serde_json::to_vec(request) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    request_type,
                    error = %e,
                    "Request could not be serialized; caching skipped"
                );
                return None;
            }
        };

        Some(Self {
            request_type,
            fingerprint: format!("{:x}", Sha256::digest(&bytes)),
            ttl: request.cache_duration(),
            share: share_response::<R::Response>,
            restore: restore_response::<R::Response>,
        })
    }

    /// Returns the cache key: request type identity plus content hash.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.request_type, self.fingerprint)
    }

    /// Returns the hex-encoded SHA-256 of the serialised request.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Returns the requested time-to-live, if the request set one.
    #[must_use]
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Converts a freshly produced response into a shareable cache value.
    #[must_use]
    pub fn share(&self, response: &(dyn Any + Send)) -> Option<CachedValue> {
        (self.share)(response)
    }

    /// Clones a cached value back into an owned response.
    #[must_use]
    pub fn restore(&self, cached: &(dyn Any + Send + Sync)) -> Option<Box<dyn Any + Send>> {
        (self.restore)(cached)
    }
}

impl fmt::Debug for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDirective")
            .field("request_type", &self.request_type)
            .field("fingerprint", &self.fingerprint)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn share_response<T: Clone + Send + Sync + 'static>(response: &(dyn Any + Send)) -> Option<CachedValue> {
    response
        .downcast_ref::<T>()
        .map(|value| Arc::new(value.clone()) as CachedValue)
}

fn restore_response<T: Clone + Send + Sync + 'static>(
    cached: &(dyn Any + Send + Sync),
) -> Option<Box<dyn Any + Send>> {
    cached
        .downcast_ref::<T>()
        .map(|value| Box::new(value.clone()) as Box<dyn Any + Send>)
}
