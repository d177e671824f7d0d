//! Read-through query cache.
//!
//! Catalog reads go through [`QueryCache::get_or_compute`]: a fresh entry is
//! returned as-is, otherwise the compute function runs and its result is
//! stored for the operation's TTL.
//!
//! # Semantics
//!
//! - Entries expire individually (`moka` per-entry expiry).
//! - Concurrent misses on the same key share one computation; every caller
//!   gets that computation's result or its error.
//! - Failures are never cached.
//! - Nothing invalidates entries on catalog writes. Staleness is bounded by
//!   the TTL; callers that need fresher reads call [`QueryCache::invalidate`].

mod key;
mod policy;

pub use key::CacheKey;
pub use policy::CacheOperation;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Errors returned by [`QueryCache::get_or_compute`].
#[derive(Debug, Error)]
pub enum CacheError<E>
where
    E: std::error::Error + 'static,
{
    /// The compute function failed.
    #[error(transparent)]
    Compute(E),

    /// The computed value could not be serialized for storage.
    #[error("failed to encode cached payload: {0}")]
    Encode(serde_json::Error),

    /// A stored payload did not match the requested type.
    #[error("failed to decode cached payload: {0}")]
    Decode(serde_json::Error),
}

impl<E> CacheError<E>
where
    E: std::error::Error + 'static,
{
    /// The compute function's own error, if that is what failed.
    pub const fn compute_error(&self) -> Option<&E> {
        match self {
            Self::Compute(err) => Some(err),
            Self::Encode(_) | Self::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    payload: Arc<serde_json::Value>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, CachedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared read-through cache for serialized query results.
///
/// Cheaply cloneable; clones share entries.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<String, CachedEntry>,
}

impl QueryCache {
    /// Create a cache holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// If another task is already computing `key`, this waits for that result
    /// instead of running `compute` again.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Compute` when `compute` fails (shared by every
    /// waiting caller, hence the `Arc`). Nothing is stored in that case.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, Arc<CacheError<E>>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let computed = AtomicBool::new(false);

        let init = async {
            computed.store(true, Ordering::Relaxed);
            let value = compute().await.map_err(CacheError::Compute)?;
            let payload = serde_json::to_value(&value).map_err(CacheError::Encode)?;
            Ok::<_, CacheError<E>>(CachedEntry {
                payload: Arc::new(payload),
                ttl,
            })
        };

        let entry = self
            .entries
            .try_get_with(key.as_str().to_owned(), init)
            .await?;

        if computed.load(Ordering::Relaxed) {
            debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache miss, stored result");
        } else {
            debug!(key = %key, "Cache hit");
        }

        T::deserialize(entry.payload.as_ref()).map_err(|e| Arc::new(CacheError::Decode(e)))
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key.as_str()).await;
    }

    /// Drop every entry.
    pub async fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Whether a fresh entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key.as_str())
    }

    /// Approximate number of live entries.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entry_count", &self.entries.entry_count())
            .finish_non_exhaustive()
    }
}
