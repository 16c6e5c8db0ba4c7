//! Key-value cache with per-entry expiry.
//!
//! Holds short-lived integration data: OAuth anti-forgery state, freshly issued
//! credentials and item snapshots. Values are opaque strings; callers serialize.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{cache_error, CacheErrorKind, Error};

/// Trait for an expiring key-value cache.
///
/// An entry whose TTL has elapsed must behave exactly like an absent key.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous entry, for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Atomically delete `key` only if it currently holds `expected`.
    ///
    /// Returns `true` if the entry was deleted.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, Error>;
}

/// Read a JSON-encoded value from the cache.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, Error> {
    match cache.get(key).await? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::Cache(CacheErrorKind::Serialization),
        }),
        None => Ok(None),
    }
}

/// Write a value to the cache as JSON.
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), Error> {
    let raw = serde_json::to_string(value)
        .map_err(|e| cache_error(CacheErrorKind::Serialization, &e.to_string()))?;
    cache.set(key, &raw, ttl).await
}
