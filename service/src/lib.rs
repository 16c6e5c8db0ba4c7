use config::{CacheBackend, Config};
use integration_auth::cache::{Cache, MemoryCache, RedisCache};
use integration_auth::store::{IdentityStore, JsonFileStore};
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub mod config;

/// How often the in-memory cache drops expired entries.
const MEMORY_CACHE_SWEEP_PERIOD: Duration = Duration::from_secs(60);
pub mod logging;

/// Connect the cache backend selected by the configuration.
///
/// The Redis backend is pinged once here so a bad URL fails at startup.
pub async fn init_cache(config: &Config) -> Result<Arc<dyn Cache>, integration_auth::Error> {
    match config.cache_backend {
        CacheBackend::Memory => {
            info!("Using in-memory cache");
            let cache = Arc::new(MemoryCache::new());
            cache.start_sweeper(MEMORY_CACHE_SWEEP_PERIOD);
            Ok(cache as Arc<dyn Cache>)
        }
        CacheBackend::Redis => {
            info!(
                "Connecting to Redis cache (key prefix {:?})",
                config.cache_key_prefix
            );
            let cache = RedisCache::connect(config.redis_url(), config.cache_key_prefix.clone()).await?;
            Ok(Arc::new(cache))
        }
    }
}

/// Open the durable identity store.
pub fn init_identity_store(config: &Config) -> Arc<dyn IdentityStore> {
    info!(
        "Identity links stored in {}",
        config.identity_store_path.display()
    );
    Arc::new(JsonFileStore::new(config.identity_store_path.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_init_memory_cache() {
        let config = Config::parse_from(["hubspot_connector", "--cache-backend", "memory"]);
        let cache = init_cache(&config).await.unwrap();

        cache
            .set("k", "v", std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_init_identity_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let config = Config::parse_from([
            "hubspot_connector",
            "--identity-store-path",
            path.to_str().unwrap(),
        ]);

        let store = init_identity_store(&config);
        store
            .upsert_identity("hubspot", "user1", "org1", "42")
            .await
            .unwrap();
        assert!(path.exists());
    }
}
