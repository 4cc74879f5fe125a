//! Configuration for the cache.
//!
//! This module provides a builder for configuring cache behavior: the
//! capacity bound, expiry time, eviction and write policies, the backing
//! store, eager warm-up keys, the clock, and the lane count.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::store::BackingStore;

/// Which access signal picks replacement-eviction victims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionAlgorithm {
    /// Evict the least recently accessed entries first.
    Recency,

    /// Evict the least frequently accessed entries first, ties broken by
    /// least recent access.
    Frequency,
}

/// When a `set` reaches the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Persist to the backing store and await its acknowledgment before
    /// the `set` completes.
    WriteThrough,

    /// Complete immediately; the value reaches the store only through a
    /// later write-through write.
    WriteBack,
}

/// Configuration for creating a new cache.
///
/// Use the builder pattern to construct configuration:
///
/// ```
/// use backed_cache::{CacheConfig, EvictionAlgorithm, MemoryStore, WritePolicy};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store: Arc<MemoryStore<String, String>> = Arc::new(MemoryStore::new());
/// let config: CacheConfig<String, String> = CacheConfig::new()
///     .max_size(10_000)
///     .expiry_time(Duration::from_secs(300))
///     .eviction_algorithm(EvictionAlgorithm::Frequency)
///     .write_policy(WritePolicy::WriteBack)
///     .backing_store(store)
///     .build();
/// ```
pub struct CacheConfig<K, V> {
    /// Capacity bound. Admission evicts once the cache holds this many
    /// entries.
    pub(crate) max_size: usize,

    /// Time-to-live applied uniformly to every entry.
    pub(crate) expiry_time: Duration,

    /// Which access signal drives eviction.
    pub(crate) eviction_algorithm: EvictionAlgorithm,

    /// When writes reach the backing store.
    pub(crate) write_policy: WritePolicy,

    /// The store being fronted. Required; its absence fails construction.
    pub(crate) store: Option<Arc<dyn BackingStore<K, V>>>,

    /// Keys loaded before the cache is considered ready.
    pub(crate) eager_keys: HashSet<K>,

    /// Timestamp source.
    pub(crate) clock: Arc<dyn Clock>,

    /// Number of sequential dispatch lanes.
    pub(crate) lane_count: usize,
}

impl<K, V> Default for CacheConfig<K, V> {
    fn default() -> Self {
        Self {
            max_size: 1000,
            expiry_time: Duration::from_secs(365 * 24 * 60 * 60),
            eviction_algorithm: EvictionAlgorithm::Recency,
            write_policy: WritePolicy::WriteThrough,
            store: None,
            eager_keys: HashSet::new(),
            clock: Arc::new(SystemClock),
            lane_count: default_lane_count(),
        }
    }
}

fn default_lane_count() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(4)
}

impl<K, V> CacheConfig<K, V> {
    /// Create a configuration with default values: 1000 entries, one-year
    /// expiry, recency eviction, write-through, one lane per available
    /// core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity bound. Clamped to at least one entry.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Set the uniform time-to-live. `Duration::ZERO` makes every entry
    /// expire as soon as any time has passed since insertion.
    pub fn expiry_time(mut self, expiry_time: Duration) -> Self {
        self.expiry_time = expiry_time;
        self
    }

    /// Select the eviction algorithm.
    pub fn eviction_algorithm(mut self, algorithm: EvictionAlgorithm) -> Self {
        self.eviction_algorithm = algorithm;
        self
    }

    /// Select the write policy.
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Set the backing store the cache fronts.
    pub fn backing_store(mut self, store: Arc<dyn BackingStore<K, V>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the timestamp source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the number of dispatch lanes. Zero keeps the default (available
    /// parallelism).
    pub fn lane_count(mut self, lanes: usize) -> Self {
        if lanes > 0 {
            self.lane_count = lanes;
        }
        self
    }

    /// Finalize the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl<K: Eq + Hash, V> CacheConfig<K, V> {
    /// Add keys to load eagerly at construction, before the cache is
    /// considered ready.
    pub fn eager_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        self.eager_keys.extend(keys);
        self
    }
}

impl<K: Clone, V> Clone for CacheConfig<K, V> {
    fn clone(&self) -> Self {
        Self {
            max_size: self.max_size,
            expiry_time: self.expiry_time,
            eviction_algorithm: self.eviction_algorithm,
            write_policy: self.write_policy,
            store: self.store.clone(),
            eager_keys: self.eager_keys.clone(),
            clock: Arc::clone(&self.clock),
            lane_count: self.lane_count,
        }
    }
}

impl<K, V> fmt::Debug for CacheConfig<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_size", &self.max_size)
            .field("expiry_time", &self.expiry_time)
            .field("eviction_algorithm", &self.eviction_algorithm)
            .field("write_policy", &self.write_policy)
            .field("store", &self.store.is_some())
            .field("eager_keys", &self.eager_keys.len())
            .field("lane_count", &self.lane_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_default_config() {
        let config: CacheConfig<String, String> = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.expiry_time, Duration::from_secs(365 * 24 * 60 * 60));
        assert_eq!(config.eviction_algorithm, EvictionAlgorithm::Recency);
        assert_eq!(config.write_policy, WritePolicy::WriteThrough);
        assert!(config.store.is_none());
        assert!(config.eager_keys.is_empty());
        assert!(config.lane_count >= 1);
    }

    #[test]
    fn test_builder_pattern() {
        let store: Arc<MemoryStore<String, u32>> = Arc::new(MemoryStore::new());
        let config: CacheConfig<String, u32> = CacheConfig::new()
            .max_size(5)
            .expiry_time(Duration::from_secs(60))
            .eviction_algorithm(EvictionAlgorithm::Frequency)
            .write_policy(WritePolicy::WriteBack)
            .backing_store(store)
            .eager_keys(["a".to_string(), "b".to_string()])
            .lane_count(2)
            .build();

        assert_eq!(config.max_size, 5);
        assert_eq!(config.expiry_time, Duration::from_secs(60));
        assert_eq!(config.eviction_algorithm, EvictionAlgorithm::Frequency);
        assert_eq!(config.write_policy, WritePolicy::WriteBack);
        assert!(config.store.is_some());
        assert_eq!(config.eager_keys.len(), 2);
        assert_eq!(config.lane_count, 2);
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let config: CacheConfig<String, String> = CacheConfig::new().max_size(0);
        assert_eq!(config.max_size, 1);
    }

    #[test]
    fn test_zero_lane_count_keeps_default() {
        let fallback = default_lane_count();
        let config: CacheConfig<String, String> = CacheConfig::new().lane_count(0);
        assert_eq!(config.lane_count, fallback);
    }
}
