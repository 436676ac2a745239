//! Response cache storage.
//!
//! The caching behavior stores responses in a [`CacheStore`]. The default
//! [`MemoryCacheStore`] keeps entries in a concurrent map with absolute
//! expiry instants read from an injectable [`Clock`], so tests can move time
//! forward with [`ManualClock`] instead of sleeping.
//!
//! Concurrent misses for the same key are not coalesced: each one runs the
//! handler and the last write wins.

use dashmap::DashMap;
use hermes_core::request::CachedValue;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// ```
/// use hermes_pipeline::cache::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(301));
/// assert_eq!(clock.now() - start, Duration::from_secs(301));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Storage for cached responses.
pub trait CacheStore: Send + Sync + 'static {
    /// Returns the live value for `key`, if any.
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Stores `value` under `key` for `ttl`.
    ///
    /// Returns `false` if the store declined the entry.
    fn set(&self, key: String, value: CachedValue, ttl: Duration) -> bool;

    /// Removes `key`. Returns `true` if it was present.
    fn remove(&self, key: &str) -> bool;

    /// Drops every expired entry and returns how many were dropped.
    fn purge_expired(&self) -> usize;

    /// Returns the number of stored entries, expired or not.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    fn clear(&self);
}

struct CacheEntry {
    value: CachedValue,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Default maximum number of entries in a [`MemoryCacheStore`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory [`CacheStore`] backed by a `DashMap`.
///
/// Bounded by `max_entries`: when full it first purges expired entries and,
/// if still full, skips the insert.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryCacheStore {
    /// Creates a store using the system clock.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Creates a store reading time from `clock`.
    #[must_use]
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_entries,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(Arc::clone(&entry.value)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        None
    }

    fn set(&self, key: String, value: CachedValue, ttl: Duration) -> bool {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                tracing::debug!(
                    max_entries = self.max_entries,
                    "Cache full; entry not stored"
                );
                return false;
            }
        }

        let expires_at = self.clock.now().checked_add(ttl);
        self.entries.insert(key, CacheEntry { value, expires_at });
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

impl fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}
