//! The main cache interface.
//!
//! This module provides the primary `Cache` type that users interact with.
//! It wraps the internal engine and provides a clean, clonable, async API.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::dispatch::Deferred;
use crate::engine::Engine;
use crate::error::CacheResult;
use crate::event::CacheEvent;
use crate::stats::{CacheStats, StatsSnapshot};

/// An async, bounded, generic key/value cache in front of a backing store.
///
/// # Features
/// - **Read-through**: misses load from the backing store, with at most one
///   in-flight load per key no matter how many callers ask.
/// - **Per-key ordering**: operations on a key take effect in submission
///   order; unrelated keys proceed in parallel.
/// - **Bounded**: a capacity cap enforced by expiry sweeps and
///   priority-based eviction (recency or frequency).
/// - **Audited**: loads, writes, overwrites, and evictions append to an
///   event log readable at any time.
///
/// # Example
/// ```no_run
/// use backed_cache::{Cache, CacheConfig, MemoryStore};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn demo() -> backed_cache::CacheResult<()> {
/// let store = Arc::new(MemoryStore::new());
/// store.put("user:1".to_string(), "Alice".to_string());
///
/// let config = CacheConfig::new()
///     .max_size(1000)
///     .expiry_time(Duration::from_secs(300))
///     .backing_store(store);
/// let cache = Cache::new(config).await?;
///
/// // Miss: loaded from the store.
/// assert_eq!(cache.get("user:1".to_string()).await?, "Alice");
///
/// // Write-through: cached and persisted.
/// cache.set("user:2".to_string(), "Bob".to_string()).await?;
///
/// // Hit: served without touching the store.
/// assert_eq!(cache.get("user:2".to_string()).await?, "Bob");
/// # Ok(())
/// # }
/// ```
pub struct Cache<K, V> {
    engine: Arc<Engine<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Build a cache from `config`, eagerly loading any configured warm
    /// keys before returning.
    ///
    /// # Errors
    /// - [`CacheError::Configuration`](crate::CacheError::Configuration)
    ///   when no backing store was configured.
    /// - [`CacheError::LoadFailed`](crate::CacheError::LoadFailed) when an
    ///   eager load fails; the cache is not constructed.
    pub async fn new(mut config: CacheConfig<K, V>) -> CacheResult<Self> {
        let eager: Vec<K> = config.eager_keys.drain().collect();
        let engine = Engine::from_config(config)?;
        Arc::clone(&engine).warm_up(eager).await?;
        Ok(Self { engine })
    }

    /// Look up `key`, loading it from the backing store on a miss or after
    /// expiry.
    ///
    /// The operation is queued on the key's lane immediately; the returned
    /// [`Deferred`] resolves once it has run. Every access bumps the key's
    /// access details, which is what the eviction policy ranks by.
    pub fn get(&self, key: K) -> Deferred<V> {
        Arc::clone(&self.engine).get(key)
    }

    /// Insert or overwrite `key`.
    ///
    /// Under write-through the deferred resolves after the backing store
    /// acknowledges the persist; under write-back it resolves as soon as
    /// the entry is cached. Overwriting a live entry records an update
    /// event carrying the replaced record.
    pub fn set(&self, key: K, value: V) -> Deferred<()> {
        Arc::clone(&self.engine).set(key, value)
    }

    /// A point-in-time copy of the audit trail, in append order.
    pub fn events(&self) -> Vec<CacheEvent<K, V>> {
        self.engine.events()
    }

    /// Number of entries, pending loads included.
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.engine.len() == 0
    }

    /// A snapshot of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats().snapshot()
    }

    /// The live counters, for wiring into external metrics systems.
    pub fn stats_ref(&self) -> Arc<CacheStats> {
        self.engine.stats()
    }
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config_with_store() -> (Arc<MemoryStore<String, String>>, CacheConfig<String, String>) {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig::new().backing_store(store.clone());
        (store, config)
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let (_, config) = config_with_store();
        let cache = Cache::new(config).await.expect("store is configured");

        cache
            .set("key".to_string(), "value".to_string())
            .await
            .expect("set succeeds");
        assert_eq!(
            cache.get("key".to_string()).await.expect("key is cached"),
            "value"
        );
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_is_clone() {
        let (_, config) = config_with_store();
        let cache1 = Cache::new(config).await.expect("store is configured");
        cache1
            .set("key".to_string(), "value".to_string())
            .await
            .expect("set succeeds");

        // Both handles point to the same underlying engine.
        let cache2 = cache1.clone();
        assert_eq!(
            cache2.get("key".to_string()).await.expect("key is cached"),
            "value"
        );

        cache2
            .set("key2".to_string(), "value2".to_string())
            .await
            .expect("set succeeds");
        assert_eq!(
            cache1.get("key2".to_string()).await.expect("key is cached"),
            "value2"
        );
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let (store, config) = config_with_store();
        store.put("seeded".to_string(), "from-store".to_string());
        let cache = Cache::new(config).await.expect("store is configured");

        cache
            .set("key".to_string(), "value".to_string())
            .await
            .expect("set succeeds");
        let _ = cache.get("key".to_string()).await; // hit
        let _ = cache.get("seeded".to_string()).await; // miss, loads

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.persists, 1);
        assert_eq!(stats.size, 2);
    }
}
