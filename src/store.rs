//! The backing-store seam.
//!
//! The cache fronts an arbitrary store: anything that can asynchronously
//! load a value by key and persist one back. Adapters are free to fail
//! either operation independently; the engine maps those failures onto
//! [`CacheError`](crate::CacheError) without retrying.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;
use parking_lot::RwLock;

/// Errors produced by a backing-store adapter.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An asynchronous source of truth sitting behind the cache.
///
/// `load` is called on cache misses (and eager warm-up); `persist` is
/// called by write-through `set`s. Both run to completion once started;
/// the engine never cancels them.
#[async_trait]
pub trait BackingStore<K, V>: Send + Sync {
    /// Produce the value for `key`.
    async fn load(&self, key: &K) -> Result<V, StoreError>;

    /// Durably record `value` under `key`. `inserted_at` is the cache
    /// insertion time of the record being persisted.
    async fn persist(&self, key: &K, value: &V, inserted_at: u64) -> Result<(), StoreError>;
}

/// A hash-map-backed reference store.
///
/// Handy as the store behind examples, tests, and benchmarks; `load` fails
/// for keys that were never seeded or persisted.
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> MemoryStore<K, V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the store with a value, outside the cache protocol.
    pub fn put(&self, key: K, value: V) {
        self.entries.write().insert(key, value);
    }

    /// Number of values in the store.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no values.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> MemoryStore<K, V> {
    /// Read a value directly, outside the cache protocol.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }
}

impl<K: Eq + Hash, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for MemoryStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.entries.read().len())
            .finish()
    }
}

#[async_trait]
impl<K, V> BackingStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn load(&self, key: &K) -> Result<V, StoreError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::from("key not present in backing store"))
    }

    async fn persist(&self, key: &K, value: &V, _inserted_at: u64) -> Result<(), StoreError> {
        self.entries.write().insert(key.clone(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_returns_seeded_value() {
        let store = MemoryStore::new();
        store.put("key", 41u32);

        let loaded = store.load(&"key").await.expect("seeded key loads");
        assert_eq!(loaded, 41);
    }

    #[tokio::test]
    async fn test_load_fails_for_missing_key() {
        let store: MemoryStore<&str, u32> = MemoryStore::new();
        assert!(store.load(&"missing").await.is_err());
    }

    #[tokio::test]
    async fn test_persist_is_visible_to_load() {
        let store = MemoryStore::new();
        store.persist(&"key", &7u32, 0).await.expect("persist succeeds");

        assert_eq!(store.get(&"key"), Some(7));
        assert_eq!(store.len(), 1);
    }
}
