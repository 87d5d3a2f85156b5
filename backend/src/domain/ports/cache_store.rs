//! Port for the key/value side of the in-memory store.
//!
//! Values are opaque strings. The read cache stores JSON payloads and uses the
//! empty string as a "known missing" sentinel.
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by cache store adapters.
    pub enum CacheStoreError {
        /// Store is unreachable or a pooled connection could not be obtained.
        Connection { message: String } => "cache store connection failed: {message}",
        /// The command reached the store but failed.
        Command { message: String } => "cache store command failed: {message}",
    }
}

/// Key/value and list operations used by the read cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a string value; `None` when the key is absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError>;

    /// Write a string value that expires after `ttl`.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError>;

    /// Read every element of a list; an absent key yields an empty list.
    async fn list_range(&self, key: &CacheKey) -> Result<Vec<String>, CacheStoreError>;

    /// Replace a list with `values` and set its expiry in one round trip.
    async fn replace_list(
        &self,
        key: &CacheKey,
        values: &[String],
        ttl: Duration,
    ) -> Result<(), CacheStoreError>;
}
