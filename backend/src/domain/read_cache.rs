//! Cache-aside read engine over the [`CacheStore`] port.
//!
//! Keyed reads follow this sequence:
//!
//! 1. A cached non-empty payload is decoded and returned.
//! 2. A cached empty string is a "known missing" sentinel, so `None` comes
//!    back without a store query.
//! 3. On a miss, concurrent callers for the same key are coalesced into one
//!    relational load. The leader reads the key once more before querying,
//!    so a caller that missed just before an earlier load wrote the key
//!    does not query again.
//! 4. A relational miss writes the sentinel with a short TTL. A hit writes
//!    the JSON payload with the base TTL plus random jitter.
//!
//! Cache failures never fail a read. A failing cache read falls through to
//! the loader. A failing write-back is logged and the loaded value is still
//! returned. A payload that no longer decodes is deleted and reloaded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::RequestCoalescer;
use crate::domain::ports::{CacheKey, CacheStore};

const EMPTY_SENTINEL: &str = "";

/// TTLs applied by the read cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtlPolicy {
    /// Base lifetime of a cached value.
    pub value_ttl: Duration,
    /// Upper bound of the random extension added to `value_ttl`.
    pub max_jitter: Duration,
    /// Lifetime of the "known missing" sentinel.
    pub empty_ttl: Duration,
}

impl Default for CacheTtlPolicy {
    fn default() -> Self {
        Self {
            value_ttl: Duration::from_secs(2 * 60 * 60),
            max_jitter: Duration::from_secs(5 * 60),
            empty_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Source of TTL jitter.
pub trait TtlJitter: Send + Sync {
    /// Return a duration in `[0, max]`.
    fn jitter(&self, max: Duration) -> Duration;
}

/// Uniform random jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTtlJitter;

impl TtlJitter for RandomTtlJitter {
    fn jitter(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

type LoadResult = Result<Option<String>, Error>;

/// Cache-aside engine shared by the catalogue services.
pub struct ReadCache {
    store: Arc<dyn CacheStore>,
    policy: CacheTtlPolicy,
    jitter: Arc<dyn TtlJitter>,
    coalescer: RequestCoalescer<CacheKey, LoadResult>,
}

impl ReadCache {
    /// Cache with uniformly random TTL jitter.
    pub fn new(store: Arc<dyn CacheStore>, policy: CacheTtlPolicy) -> Self {
        Self::with_jitter(store, policy, Arc::new(RandomTtlJitter))
    }

    /// Cache with an explicit jitter source.
    pub fn with_jitter(
        store: Arc<dyn CacheStore>,
        policy: CacheTtlPolicy,
        jitter: Arc<dyn TtlJitter>,
    ) -> Self {
        Self {
            store,
            policy,
            jitter,
            coalescer: RequestCoalescer::new(),
        }
    }

    /// Read `key` through the cache, invoking `load` on a miss.
    ///
    /// `Ok(None)` means the value does not exist in the relational store.
    pub async fn get_or_load<T, F, Fut>(&self, key: &CacheKey, load: F) -> Result<Option<T>, Error>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, Error>> + Send + 'static,
    {
        match self.store.get(key).await {
            Ok(Some(payload)) if payload == EMPTY_SENTINEL => {
                debug!(key = %key, "cache hit on missing-value sentinel");
                return Ok(None);
            }
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => return Ok(Some(value)),
                Err(error) => {
                    warn!(key = %key, %error, "discarding undecodable cache entry");
                    self.invalidate(key).await;
                }
            },
            Ok(None) => {}
            Err(error) => {
                warn!(key = %key, %error, "cache read failed; loading from store");
            }
        }

        let store = Arc::clone(&self.store);
        let jitter = Arc::clone(&self.jitter);
        let policy = self.policy;
        let write_key = key.clone();
        let loaded = load();
        let payload = self
            .coalescer
            .run(key.clone(), move || async move {
                // An earlier leader may have filled the key after our read.
                if let Some(settled) = recheck::<T>(store.as_ref(), &write_key).await {
                    return Ok(settled);
                }
                let Some(value) = loaded.await? else {
                    if let Err(error) = store
                        .set(&write_key, EMPTY_SENTINEL, policy.empty_ttl)
                        .await
                    {
                        warn!(key = %write_key, %error, "failed to cache missing-value sentinel");
                    }
                    return Ok(None);
                };
                let payload = serde_json::to_string(&value).map_err(|error| {
                    Error::internal(format!("failed to encode cache entry: {error}"))
                })?;
                let ttl = policy.value_ttl + jitter.jitter(policy.max_jitter);
                if let Err(error) = store.set(&write_key, &payload, ttl).await {
                    warn!(key = %write_key, %error, "failed to write cache entry");
                }
                Ok(Some(payload))
            })
            .await?;

        payload
            .map(|payload| {
                serde_json::from_str::<T>(&payload).map_err(|error| {
                    Error::internal(format!("failed to decode loaded value: {error}"))
                })
            })
            .transpose()
    }

    /// Read a whole list through the cache, invoking `load` when the cached
    /// list is empty, unreadable, or corrupt.
    pub async fn get_or_load_list<T, F, Fut>(
        &self,
        key: &CacheKey,
        load: F,
    ) -> Result<Vec<T>, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, Error>>,
    {
        match self.store.list_range(key).await {
            Ok(items) if !items.is_empty() => {
                match items
                    .iter()
                    .map(|item| serde_json::from_str::<T>(item))
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(values) => return Ok(values),
                    Err(error) => {
                        warn!(key = %key, %error, "discarding undecodable cached list");
                        self.invalidate(key).await;
                    }
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!(key = %key, %error, "cached list read failed; loading from store");
            }
        }

        let values = load().await?;
        if values.is_empty() {
            return Ok(values);
        }
        let encoded = values
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| Error::internal(format!("failed to encode cached list: {error}")))?;
        let ttl = self.policy.value_ttl + self.jitter.jitter(self.policy.max_jitter);
        if let Err(error) = self.store.replace_list(key, &encoded, ttl).await {
            warn!(key = %key, %error, "failed to write cached list");
        }
        Ok(values)
    }

    /// Drop a cached entry. Failures are logged, never returned.
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(error) = self.store.delete(key).await {
            warn!(key = %key, %error, "failed to invalidate cache entry");
        }
    }
}

/// Look at `key` once more from inside the coalesced load. Returns the
/// settled payload (`None` for the sentinel) or `None` when a load is needed.
async fn recheck<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &CacheKey,
) -> Option<Option<String>> {
    match store.get(key).await {
        Ok(Some(payload)) if payload == EMPTY_SENTINEL => {
            debug!(key = %key, "sentinel written by an earlier load");
            Some(None)
        }
        Ok(Some(payload)) if serde_json::from_str::<T>(&payload).is_ok() => Some(Some(payload)),
        Ok(_) | Err(_) => None,
    }
}
