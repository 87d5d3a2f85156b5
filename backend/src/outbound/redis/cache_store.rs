//! Redis-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};

use super::RedisPool;
use super::reply::cache_error;

/// String and list cache entries stored under their [`CacheKey`].
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: RedisPool,
}

impl RedisCacheStore {
    /// Cache store over `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

/// Expiry in whole milliseconds, never zero so a key cannot outlive its TTL.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheStoreError::connection(err.to_string()))?;
        redis::cmd("GET")
            .arg(key.as_str())
            .query_async::<Option<String>>(&mut *conn)
            .await
            .map_err(cache_error)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheStoreError::connection(err.to_string()))?;
        redis::cmd("SET")
            .arg(key.as_str())
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut *conn)
            .await
            .map_err(cache_error)
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheStoreError::connection(err.to_string()))?;
        redis::cmd("DEL")
            .arg(key.as_str())
            .query_async::<()>(&mut *conn)
            .await
            .map_err(cache_error)
    }

    async fn list_range(&self, key: &CacheKey) -> Result<Vec<String>, CacheStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheStoreError::connection(err.to_string()))?;
        redis::cmd("LRANGE")
            .arg(key.as_str())
            .arg(0)
            .arg(-1)
            .query_async::<Vec<String>>(&mut *conn)
            .await
            .map_err(cache_error)
    }

    async fn replace_list(
        &self,
        key: &CacheKey,
        values: &[String],
        ttl: Duration,
    ) -> Result<(), CacheStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheStoreError::connection(err.to_string()))?;
        let mut pipeline = redis::pipe();
        pipeline.atomic();
        pipeline.cmd("DEL").arg(key.as_str()).ignore();
        if !values.is_empty() {
            pipeline
                .cmd("RPUSH")
                .arg(key.as_str())
                .arg(values.to_vec())
                .ignore();
            pipeline
                .cmd("PEXPIRE")
                .arg(key.as_str())
                .arg(ttl_millis(ttl))
                .ignore();
        }
        pipeline
            .query_async::<()>(&mut *conn)
            .await
            .map_err(cache_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::ZERO, 1)]
    #[case(Duration::from_micros(500), 1)]
    #[case(Duration::from_secs(2), 2_000)]
    fn ttl_is_rounded_to_positive_millis(#[case] ttl: Duration, #[case] expected: u64) {
        assert_eq!(ttl_millis(ttl), expected);
    }
}
