//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, Script};
use tokio::sync::Mutex;
use tracing::debug;

use super::Cache;
use crate::error::{cache_error, CacheErrorKind, Error};

/// Deletes KEYS[1] only when it still holds ARGV[1], in one server-side step.
const DELETE_IF_EQ_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis cache with a lazily opened, reused multiplexed connection.
///
/// Every key is namespaced with `key_prefix` so several integrations can share
/// one Redis database.
pub struct RedisCache {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    key_prefix: String,
}

impl RedisCache {
    /// Create a new Redis cache. No connection is made until first use.
    pub fn new(redis_url: &str, key_prefix: String) -> Result<Self, Error> {
        let client = Client::open(redis_url)?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            key_prefix,
        })
    }

    /// Open a connection and verify it with PING, failing early if Redis is down.
    pub async fn connect(redis_url: &str, key_prefix: String) -> Result<Self, Error> {
        let cache = Self::new(redis_url, key_prefix)?;
        let mut conn = cache.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(cache)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, Error> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Opening Redis connection");
        let conn = self.client.get_multiplexed_tokio_connection().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Drop a connection that failed so the next call reconnects.
    async fn reset_connection(&self) {
        *self.connection.lock().await = None;
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn on_error<T>(&self, result: redis::RedisResult<T>) -> Result<T, Error> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_connection_dropped() || err.is_io_error() {
                    self.reset_connection().await;
                }
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<Option<String>> = conn.get(&key).await;
        self.on_error(result).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let seconds = ttl.as_secs();
        if seconds == 0 {
            return Err(cache_error(
                CacheErrorKind::Command,
                "Redis expiry must be at least one second",
            ));
        }

        let key = self.prefixed_key(key);
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<()> = conn.set_ex(&key, value, seconds).await;
        self.on_error(result).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<()> = conn.del(&key).await;
        self.on_error(result).await
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, Error> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection().await?;
        let script = Script::new(DELETE_IF_EQ_SCRIPT);
        let mut invocation = script.key(&key);
        invocation.arg(expected);
        let result: redis::RedisResult<i64> = invocation.invoke_async(&mut conn).await;
        Ok(self.on_error(result).await? == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        // Nothing listens on this port; construction must still succeed.
        let result = RedisCache::new("redis://127.0.0.1:1", "hubspot:".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisCache::new("not a url", "hubspot:".to_string());
        assert!(matches!(
            result,
            Err(Error {
                error_kind: crate::ErrorKind::Cache(_),
                ..
            })
        ));
    }

    #[test]
    fn test_key_prefix() {
        let cache = RedisCache::new("redis://127.0.0.1:6379", "hubspot:".to_string()).unwrap();
        assert_eq!(cache.prefixed_key("items:123"), "hubspot:items:123");
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected_before_connecting() {
        let cache = RedisCache::new("redis://127.0.0.1:1", String::new()).unwrap();
        let result = cache.set("k", "v", Duration::from_millis(500)).await;
        assert_eq!(
            result.unwrap_err().error_kind,
            crate::ErrorKind::Cache(CacheErrorKind::Command)
        );
    }
}
