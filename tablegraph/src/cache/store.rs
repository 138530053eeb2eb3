// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::warn;
use quick_cache::sync::Cache;

/// Errors returned by a cache store backend.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached or refused the operation.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry backing the result cache.
///
/// The trait is async so that remote shared stores can implement it next to the in-process
/// bounded store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value for this key, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a value under this key for the given time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-process cache tier.
///
/// Capacity-based eviction is handled by the backing cache, expiry is checked on read.
pub struct MemoryStore {
    entries: Cache<String, Entry>,
}

impl MemoryStore {
    /// Returns a new store evicting beyond `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }
}

/// Two-tier result cache consulted before and populated after every data fetch.
///
/// Reads check the local tier first and fall back to the shared tier, backfilling the local
/// tier on a shared hit. Writes go to both tiers. No consistency guarantee is made across
/// tiers beyond convergence within the TTL.
#[derive(Clone)]
pub struct ResultCache {
    local: Arc<dyn CacheStore>,
    shared: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The tiers do not implement `Debug` but we can at least print the TTL
        f.debug_struct("ResultCache").field("ttl", &self.ttl).finish()
    }
}

impl ResultCache {
    /// Returns a cache with two in-process tiers of the given capacities.
    pub fn new(local_capacity: usize, shared_capacity: usize, ttl: Duration) -> Self {
        Self::with_stores(
            Arc::new(MemoryStore::new(local_capacity)),
            Arc::new(MemoryStore::new(shared_capacity)),
            ttl,
        )
    }

    /// Returns a cache over caller-provided tiers, e.g. a remote shared store.
    pub fn with_stores(
        local: Arc<dyn CacheStore>,
        shared: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self { local, shared, ttl }
    }

    /// Looks up a key across all tiers.
    ///
    /// A failing tier degrades to a miss, the caller falls through to storage.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.local.get(key).await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => (),
            Err(err) => warn!("Local cache tier degraded to miss: {}", err),
        }

        match self.shared.get(key).await {
            Ok(Some(value)) => {
                if let Err(err) = self.local.set(key, value.clone(), self.ttl).await {
                    warn!("Could not backfill local cache tier: {}", err);
                }
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("Shared cache tier degraded to miss: {}", err);
                None
            }
        }
    }

    /// Writes a value to all tiers with the configured time-to-live.
    pub async fn set(&self, key: &str, value: String) {
        if let Err(err) = self.local.set(key, value.clone(), self.ttl).await {
            warn!("Could not write to local cache tier: {}", err);
        }
        if let Err(err) = self.shared.set(key, value, self.ttl).await {
            warn!("Could not write to shared cache tier: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{CacheError, CacheStore, MemoryStore, ResultCache};

    /// Tier which fails every operation.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: String,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn round_trips_within_ttl() {
        let cache = ResultCache::new(16, 16, Duration::from_secs(60));

        cache.set("a", "1".to_string()).await;
        assert_eq!(cache.get("a").await, Some("1".to_string()));
        assert_eq!(cache.get("b").await, None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = ResultCache::new(16, 16, Duration::from_millis(20));

        cache.set("a", "1".to_string()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn shared_tier_hits_transparently() {
        let local = Arc::new(MemoryStore::new(16));
        let shared = Arc::new(MemoryStore::new(16));
        shared
            .set("a", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let cache = ResultCache::with_stores(local.clone(), shared, Duration::from_secs(60));

        assert_eq!(cache.get("a").await, Some("1".to_string()));
        // Shared hit has been backfilled into the local tier
        assert_eq!(local.get("a").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_miss() {
        let cache = ResultCache::with_stores(
            Arc::new(BrokenStore),
            Arc::new(BrokenStore),
            Duration::from_secs(60),
        );

        cache.set("a", "1".to_string()).await;
        assert_eq!(cache.get("a").await, None);
    }
}
