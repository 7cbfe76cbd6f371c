//! Time-expiring in-memory cache.
//!
//! Read-through contract: components check the cache, fetch on a miss, and
//! write the fresh value back. The engine itself never forces a re-fetch of
//! data it was handed; callers opt into bypassing via explicit refresh APIs.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<K, V> {
    map: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> CacheInner<K, V> {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: K, value: V, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { value, expires_at });
    }

    fn clear_expired(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Thread-safe TTL cache shared across clones.
#[derive(Debug, Clone)]
pub struct CacheStore<K, V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<K, V>>>,
}

impl<K: Eq + Hash, V: Clone> CacheStore<K, V> {
    /// Create a new cache store with a default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(default_ttl))),
        }
    }

    /// Create a disabled cache: every read misses, every write is dropped.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Get a cached value if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let store = self.inner.read().await;
        store.get(key)
    }

    /// Put a value into the cache, optionally overriding the default TTL.
    /// No-op when the cache is disabled.
    pub async fn put(&self, key: K, value: V, ttl_override: Option<Duration>) {
        let mut store = self.inner.write().await;

        if store.default_ttl == Duration::ZERO {
            return;
        }

        store.put(key, value, ttl_override);
    }

    /// Remove expired entries.
    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
    }

    /// Number of entries, including not-yet-evicted expired ones.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_get_put_overwrite() {
        let cache: CacheStore<String, u32> = CacheStore::new(Duration::from_secs(1));

        assert!(cache.get(&"k".to_string()).await.is_none());

        cache.put("k".to_string(), 1, None).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some(1));

        cache.put("k".to_string(), 2, None).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some(2));
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache: CacheStore<&str, u32> = CacheStore::new(Duration::from_millis(50));

        cache.put("k", 1, None).await;
        assert!(cache.get(&"k").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&"k").await.is_none());
    }

    #[tokio::test]
    async fn ttl_override_beats_default() {
        let cache: CacheStore<&str, u32> = CacheStore::new(Duration::from_secs(60));

        cache.put("k", 1, Some(Duration::from_millis(50))).await;
        assert!(cache.get(&"k").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&"k").await.is_none());
    }

    #[tokio::test]
    async fn clear_expired_evicts() {
        let cache: CacheStore<&str, u32> = CacheStore::new(Duration::from_millis(50));

        cache.put("a", 1, None).await;
        cache.put("b", 2, None).await;
        assert_eq!(cache.len().await, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn disabled_cache_drops_writes() {
        let cache: CacheStore<&str, u32> = CacheStore::disabled();

        cache.put("k", 1, None).await;
        assert!(cache.get(&"k").await.is_none());
        assert!(cache.is_empty().await);
    }
}
