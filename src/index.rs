//! The two ordered multi-maps that drive eviction and expiry.
//!
//! Both indexes map an ordering key to a bucket of cache keys sharing that
//! position; the ordering key is never assumed unique. Buckets are popped
//! whole: every key in the front bucket is an equally good victim, so no
//! finer-grained tie-break exists.

use std::collections::BTreeMap;

use crate::config::EvictionAlgorithm;
use crate::entry::AccessDetails;

/// Total order over access details under the configured algorithm.
///
/// Recency compares last access time alone; frequency compares access count
/// and breaks ties by last access time. Folding the algorithm into a derived
/// `Ord` key lets a `BTreeMap` stand in for a comparator-parameterized
/// ordered map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    primary: u64,
    secondary: u64,
}

/// Eviction-order index: ordering key derived from access details, buckets
/// of keys sharing that position. The front bucket holds the current
/// eviction victims.
#[derive(Debug)]
pub(crate) struct PriorityIndex<K> {
    algorithm: EvictionAlgorithm,
    buckets: BTreeMap<OrderKey, Vec<K>>,
}

impl<K: PartialEq> PriorityIndex<K> {
    pub(crate) fn new(algorithm: EvictionAlgorithm) -> Self {
        Self {
            algorithm,
            buckets: BTreeMap::new(),
        }
    }

    fn order_key(&self, details: &AccessDetails) -> OrderKey {
        match self.algorithm {
            EvictionAlgorithm::Recency => OrderKey {
                primary: details.last_access_at,
                secondary: 0,
            },
            EvictionAlgorithm::Frequency => OrderKey {
                primary: details.access_count,
                secondary: details.last_access_at,
            },
        }
    }

    /// Add `key` to the bucket matching `details`.
    pub(crate) fn insert(&mut self, details: &AccessDetails, key: K) {
        let position = self.order_key(details);
        self.buckets.entry(position).or_default().push(key);
    }

    /// Remove `key` from the bucket matching `details`.
    ///
    /// An emptied bucket stays in place; the eviction path skips over empty
    /// buckets as it pops.
    pub(crate) fn remove(&mut self, details: &AccessDetails, key: &K) {
        let position = self.order_key(details);
        if let Some(bucket) = self.buckets.get_mut(&position) {
            if let Some(index) = bucket.iter().position(|candidate| candidate == key) {
                bucket.swap_remove(index);
            }
        }
    }

    /// Pop the lowest-priority non-empty bucket, discarding empty buckets
    /// passed over on the way.
    pub(crate) fn pop_front(&mut self) -> Option<Vec<K>> {
        while let Some((_, bucket)) = self.buckets.pop_first() {
            if !bucket.is_empty() {
                return Some(bucket);
            }
        }
        None
    }

    #[cfg(test)]
    fn contains(&self, details: &AccessDetails, key: &K) -> bool {
        self.buckets
            .get(&self.order_key(details))
            .is_some_and(|bucket| bucket.contains(key))
    }

    #[cfg(test)]
    fn live_len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Expiry-order index: insertion time to the keys inserted at that time.
#[derive(Debug)]
pub(crate) struct ExpiryIndex<K> {
    buckets: BTreeMap<u64, Vec<K>>,
}

impl<K: PartialEq> ExpiryIndex<K> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, inserted_at: u64, key: K) {
        self.buckets.entry(inserted_at).or_default().push(key);
    }

    pub(crate) fn remove(&mut self, inserted_at: u64, key: &K) {
        if let Some(bucket) = self.buckets.get_mut(&inserted_at) {
            if let Some(index) = bucket.iter().position(|candidate| candidate == key) {
                bucket.swap_remove(index);
            }
        }
    }

    /// Insertion time of the oldest bucket, if any.
    pub(crate) fn first_time(&self) -> Option<u64> {
        self.buckets.keys().next().copied()
    }

    /// Pop the oldest bucket.
    pub(crate) fn pop_front(&mut self) -> Option<(u64, Vec<K>)> {
        self.buckets.pop_first()
    }
}
