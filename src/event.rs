//! The audit trail of cache lifecycle events.
//!
//! Every load, write-through persist, overwrite, and eviction appends one
//! immutable event to the engine's log. The log is append-only: events are
//! never mutated or removed, and [`EventLog::snapshot`] hands observers an
//! owned copy.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::entry::RecordSnapshot;

/// Why a record was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The record outlived the configured expiry time.
    Expiry,

    /// The record's priority bucket was chosen to make room under capacity
    /// pressure.
    Replacement,
}

/// What happened to a record.
#[derive(Debug, Clone)]
pub enum EventKind<K, V> {
    /// A value was loaded from the backing store.
    Load,

    /// A value was persisted to the backing store by a write-through `set`.
    Write,

    /// A live record was overwritten by a `set`; `previous` is the record
    /// that was replaced.
    Update {
        /// The record that was replaced.
        previous: RecordSnapshot<K, V>,
    },

    /// A record was removed from the cache.
    Eviction(EvictionReason),
}

/// One entry in the audit trail.
#[derive(Debug, Clone)]
pub struct CacheEvent<K, V> {
    /// Monotonically increasing sequence number; also witnesses append
    /// order.
    pub id: u64,

    /// The record the event is about.
    pub element: RecordSnapshot<K, V>,

    /// When the event was recorded, in clock nanoseconds.
    pub timestamp: u64,

    /// What happened.
    pub kind: EventKind<K, V>,
}

impl<K, V> CacheEvent<K, V> {
    /// Whether this event records a backing-store load.
    pub fn is_load(&self) -> bool {
        matches!(self.kind, EventKind::Load)
    }

    /// Whether this event records a write-through persist.
    pub fn is_write(&self) -> bool {
        matches!(self.kind, EventKind::Write)
    }

    /// Whether this event records an overwrite of a live record.
    pub fn is_update(&self) -> bool {
        matches!(self.kind, EventKind::Update { .. })
    }

    /// Whether this event records an eviction for the given reason.
    pub fn is_eviction(&self, reason: EvictionReason) -> bool {
        matches!(self.kind, EventKind::Eviction(r) if r == reason)
    }
}

/// Append-only, unbounded event log.
///
/// There is no rotation or consumer-side backpressure; operators that poll
/// the log are expected to do so at their own cadence.
#[derive(Debug)]
pub(crate) struct EventLog<K, V> {
    sequence: AtomicU64,
    entries: Mutex<Vec<CacheEvent<K, V>>>,
}

impl<K, V> EventLog<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn append(&self, kind: EventKind<K, V>, element: RecordSnapshot<K, V>, timestamp: u64) {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push(CacheEvent {
            id,
            element,
            timestamp,
            kind,
        });
    }
}

impl<K: Clone, V: Clone> EventLog<K, V> {
    /// A point-in-time copy of the log, in append order.
    pub(crate) fn snapshot(&self) -> Vec<CacheEvent<K, V>> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AccessDetails;

    fn snapshot(key: &str) -> RecordSnapshot<String, u32> {
        RecordSnapshot {
            key: key.to_string(),
            value: 1,
            inserted_at: 0,
            access: AccessDetails::new(0),
        }
    }

    #[test]
    fn test_ids_witness_append_order() {
        let log = EventLog::new();
        log.append(EventKind::Load, snapshot("a"), 1);
        log.append(EventKind::Write, snapshot("a"), 2);
        log.append(EventKind::Eviction(EvictionReason::Expiry), snapshot("a"), 3);

        let events = log.snapshot();
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|pair| pair[0].id < pair[1].id));
        assert!(events[0].is_load());
        assert!(events[1].is_write());
        assert!(events[2].is_eviction(EvictionReason::Expiry));
        assert!(!events[2].is_eviction(EvictionReason::Replacement));
    }

    #[test]
    fn test_snapshot_is_detached_from_the_log() {
        let log = EventLog::new();
        log.append(EventKind::Load, snapshot("a"), 1);

        let before = log.snapshot();
        log.append(EventKind::Write, snapshot("a"), 2);

        assert_eq!(before.len(), 1);
        assert_eq!(log.snapshot().len(), 2);
    }
}
