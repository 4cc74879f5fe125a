//! Statistics and metrics for the cache.
//!
//! This module provides atomic counters for tracking cache operations,
//! enabling observability without impacting performance. The audit trail
//! in [`event`](crate::event) answers "what happened to this key"; these
//! counters answer "how is the cache doing overall".

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache operations.
///
/// All counters are atomic and can be safely read from any thread while
/// the engine runs. Use `Cache::stats()` for a point-in-time snapshot.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Gets that found a live, unexpired entry.
    hits: AtomicU64,

    /// Gets that had to go to the backing store.
    misses: AtomicU64,

    /// Successful backing-store loads.
    loads: AtomicU64,

    /// Successful write-through persists.
    persists: AtomicU64,

    /// Completed set operations.
    sets: AtomicU64,

    /// Entries evicted under capacity pressure.
    evictions: AtomicU64,

    /// Entries removed because they outlived the expiry time.
    expirations: AtomicU64,

    /// Current number of entries, pending loads included.
    size: AtomicU64,
}

impl CacheStats {
    /// Create a new stats instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persist(&self) {
        self.persists.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_size(&self) {
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decrement_size(&self) {
        self.size.fetch_sub(1, Ordering::Relaxed);
    }

    // Getters for reading statistics

    /// Gets served from a live entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Gets that went to the backing store.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Successful backing-store loads.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Successful write-through persists.
    pub fn persists(&self) -> u64 {
        self.persists.load(Ordering::Relaxed)
    }

    /// Completed set operations.
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    /// Entries evicted under capacity pressure.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Entries removed after outliving the expiry time.
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Current number of entries, pending loads included.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage (0.0 to 100.0); 0.0 before any gets.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            loads: self.loads(),
            persists: self.persists(),
            sets: self.sets(),
            evictions: self.evictions(),
            expirations: self.expirations(),
            size: self.size(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
///
/// Unlike [`CacheStats`], this struct contains plain values (not atomics)
/// and can be easily serialized or logged.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub persists: u64,
    pub sets: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_stats() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
        assert_eq!(stats.loads(), 0);
        assert_eq!(stats.size(), 0);
    }

    #[test]
    fn test_record_operations() {
        let stats = CacheStats::new();

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_load();
        stats.record_persist();

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.loads(), 1);
        assert_eq!(stats.persists(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();

        // No gets = 0% hit rate
        assert_eq!(stats.hit_rate(), 0.0);

        // 3 hits, 1 miss = 75% hit rate
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert!((stats.hit_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_size_tracking() {
        let stats = CacheStats::new();

        stats.increment_size();
        stats.increment_size();
        assert_eq!(stats.size(), 2);

        stats.decrement_size();
        assert_eq!(stats.size(), 1);
    }

    #[test]
    fn test_snapshot() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_set();
        stats.increment_size();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.sets, 1);
        assert_eq!(snapshot.size, 1);
    }
}
