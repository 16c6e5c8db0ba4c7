//! In-process cache backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Cache;
use crate::error::Error;

/// Cache entry with expiration.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Map size at which `set` first sweeps expired entries.
const MIN_SWEEP_THRESHOLD: usize = 256;

/// In-memory cache for tests and single-instance deployments.
///
/// Expired entries are dropped when touched, when `set` grows the map past
/// the sweep threshold, and by the background sweeper if one is started.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    next_sweep_at: AtomicUsize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            next_sweep_at: AtomicUsize::new(MIN_SWEEP_THRESHOLD),
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());

        // Next sweep once the live set has doubled.
        self.next_sweep_at.store(
            (self.entries.len() * 2).max(MIN_SWEEP_THRESHOLD),
            Ordering::Relaxed,
        );
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Purge expired entries every `period` until the cache is dropped.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }

    /// Remaining time to live for `key`, or `None` if absent or expired.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| (entry.expires_at - Utc::now()).to_std().ok())
    }

    /// Number of live entries whose key starts with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.is_expired())
            .count()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        // The shard guard must be released before removing the stale entry.
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        if self.entries.len() >= self.next_sweep_at.load(Ordering::Relaxed) {
            self.purge_expired();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, Error> {
        let removed = self
            .entries
            .remove_if(key, |_, entry| !entry.is_expired() && entry.value == expected);
        Ok(removed.is_some())
    }
}
