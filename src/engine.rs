//! Engine internals: the slot map, the get/set protocol, and capacity
//! management.
//!
//! The engine keeps one primary map from key to *slot* (the shared,
//! possibly still pending, computation of that key's record) plus two
//! ordered side indexes (eviction priority and expiry time) and the audit
//! log. A slot is installed in the map before anyone awaits it, so every
//! concurrent observer of a key shares a single in-flight load.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture, Shared};
use futures_util::FutureExt;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::{CacheConfig, WritePolicy};
use crate::dispatch::{key_hash, Deferred, LanePool};
use crate::entry::{AccessDetails, Record, RecordSnapshot};
use crate::error::{CacheError, CacheResult};
use crate::event::{CacheEvent, EventKind, EventLog, EvictionReason};
use crate::index::{ExpiryIndex, PriorityIndex};
use crate::stats::CacheStats;
use crate::store::BackingStore;

/// The shared computation of one key's record.
type Slot<K, V> = Shared<BoxFuture<'static, CacheResult<Arc<Record<K, V>>>>>;

pub(crate) struct Engine<K, V> {
    max_size: usize,
    expiry_time: Duration,
    write_policy: WritePolicy,
    store: Arc<dyn BackingStore<K, V>>,
    clock: Arc<dyn Clock>,
    lanes: LanePool,
    slots: RwLock<IndexMap<K, Slot<K, V>>>,
    priority: Mutex<PriorityIndex<K>>,
    expiry: Mutex<ExpiryIndex<K>>,
    events: EventLog<K, V>,
    /// Serializes the check-sweep-evict admission decision across lanes;
    /// the only lock held across an await.
    admission: AsyncMutex<()>,
    stats: Arc<CacheStats>,
}

impl<K, V> Engine<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_config(config: CacheConfig<K, V>) -> CacheResult<Arc<Self>> {
        let store = config
            .store
            .ok_or_else(|| CacheError::Configuration("no backing store specified".to_string()))?;
        Ok(Arc::new(Self {
            max_size: config.max_size,
            expiry_time: config.expiry_time,
            write_policy: config.write_policy,
            store,
            clock: config.clock,
            lanes: LanePool::new(config.lane_count),
            slots: RwLock::new(IndexMap::new()),
            priority: Mutex::new(PriorityIndex::new(config.eviction_algorithm)),
            expiry: Mutex::new(ExpiryIndex::new()),
            events: EventLog::new(),
            admission: AsyncMutex::new(()),
            stats: Arc::new(CacheStats::new()),
        }))
    }

    /// Load every eager key through the ordinary lane path and wait for
    /// all of them; any failure propagates as a construction failure.
    pub(crate) async fn warm_up(self: Arc<Self>, keys: Vec<K>) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        debug!(keys = keys.len(), "eager-loading cache");
        let pending: Vec<Deferred<()>> = keys
            .into_iter()
            .map(|key| {
                let engine = Arc::clone(&self);
                let hash = key_hash(&key);
                self.lanes.submit(hash, async move {
                    let load = Arc::clone(&engine).load_from_store(key.clone());
                    engine.admit(key, load, true).await.map(|_| ())
                })
            })
            .collect();
        future::try_join_all(pending).await.map(|_| ())
    }

    pub(crate) fn get(self: Arc<Self>, key: K) -> Deferred<V> {
        let engine = Arc::clone(&self);
        self.lanes
            .submit(key_hash(&key), async move { engine.get_on_lane(key).await })
    }

    pub(crate) fn set(self: Arc<Self>, key: K, value: V) -> Deferred<()> {
        let engine = Arc::clone(&self);
        self.lanes.submit(key_hash(&key), async move {
            engine.set_on_lane(key, value).await
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub(crate) fn events(&self) -> Vec<CacheEvent<K, V>> {
        self.events.snapshot()
    }

    pub(crate) fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    async fn get_on_lane(self: Arc<Self>, key: K) -> CacheResult<V> {
        let existing = self.slots.read().get(&key).cloned();
        let record = match existing {
            None => Arc::clone(&self).miss(key).await?,
            Some(slot) => match slot.await {
                // The slot belongs to a load that failed and is being torn
                // down; start over as a miss.
                Err(_) => Arc::clone(&self).miss(key).await?,
                Ok(record) => {
                    if self.has_expired(record.inserted_at()) {
                        trace!("entry expired on access");
                        self.unindex(&record);
                        self.push_event(
                            EventKind::Eviction(EvictionReason::Expiry),
                            record.snapshot(),
                        );
                        self.stats.record_expiration();
                        Arc::clone(&self).miss(key).await?
                    } else {
                        self.stats.record_hit();
                        record
                    }
                }
            },
        };
        Ok(self.touch(&record))
    }

    async fn set_on_lane(self: Arc<Self>, key: K, value: V) -> CacheResult<()> {
        let previous = self.slots.write().swap_remove(&key);
        if let Some(slot) = previous {
            self.stats.decrement_size();
            if let Ok(old) = slot.await {
                self.unindex(&old);
                if self.has_expired(old.inserted_at()) {
                    self.push_event(EventKind::Eviction(EvictionReason::Expiry), old.snapshot());
                    self.stats.record_expiration();
                } else {
                    let now = self.clock.now();
                    let replacement = RecordSnapshot {
                        key: key.clone(),
                        value: value.clone(),
                        inserted_at: now,
                        access: AccessDetails::new(now),
                    };
                    self.push_event(
                        EventKind::Update {
                            previous: old.snapshot(),
                        },
                        replacement,
                    );
                }
            }
        }

        let ready = future::ready(Ok(value)).boxed();
        let record = Arc::clone(&self).admit(key, ready, false).await?;
        self.stats.record_set();

        if self.write_policy == WritePolicy::WriteThrough {
            self.store
                .persist(record.key(), record.value(), record.inserted_at())
                .await
                .map_err(|source| {
                    debug!("write-through persist failed");
                    CacheError::PersistFailed(source.to_string())
                })?;
            self.stats.record_persist();
            self.push_event(EventKind::Write, record.snapshot());
        }
        Ok(())
    }

    /// Miss path: record the miss and admit a backing-store load.
    async fn miss(self: Arc<Self>, key: K) -> CacheResult<Arc<Record<K, V>>> {
        self.stats.record_miss();
        let load = Arc::clone(&self).load_from_store(key.clone());
        self.admit(key, load, true).await
    }

    /// Install a slot computing `key`'s record from `value_future`, run
    /// the admission capacity pass first, and await the outcome.
    ///
    /// The slot goes into the map before it is awaited; a concurrent
    /// lookup for the same key observes the pending computation instead of
    /// starting its own. `audit_load` records the resolved record as a
    /// backing-store load.
    async fn admit(
        self: Arc<Self>,
        key: K,
        value_future: BoxFuture<'static, CacheResult<V>>,
        audit_load: bool,
    ) -> CacheResult<Arc<Record<K, V>>> {
        self.manage_entries().await;

        let slot: Slot<K, V> = {
            let engine = Arc::clone(&self);
            let key = key.clone();
            async move {
                let value = value_future.await?;
                let record = engine.install(key, value);
                if audit_load {
                    engine.push_event(EventKind::Load, record.snapshot());
                }
                Ok(record)
            }
            .boxed()
            .shared()
        };

        let previous = self.slots.write().insert(key.clone(), slot.clone());
        if previous.is_none() {
            self.stats.increment_size();
        }

        let outcome = slot.clone().await;
        if outcome.is_err() {
            // Tear the failed slot down so the next lookup loads afresh;
            // leave it alone if a newer computation already took the key.
            let mut slots = self.slots.write();
            if slots.get(&key).is_some_and(|current| current.ptr_eq(&slot)) {
                slots.swap_remove(&key);
                self.stats.decrement_size();
            }
        }
        outcome
    }

    /// Build the record and enter it into both side indexes.
    fn install(&self, key: K, value: V) -> Arc<Record<K, V>> {
        let record = Arc::new(Record::new(key, value, self.clock.now()));
        self.expiry
            .lock()
            .insert(record.inserted_at(), record.key().clone());
        self.priority
            .lock()
            .insert(&record.access(), record.key().clone());
        record
    }

    fn load_from_store(self: Arc<Self>, key: K) -> BoxFuture<'static, CacheResult<V>> {
        let engine = self;
        async move {
            let value = engine
                .store
                .load(&key)
                .await
                .map_err(|source| CacheError::LoadFailed(source.to_string()))?;
            engine.stats.record_load();
            Ok(value)
        }
        .boxed()
    }

    /// Access bookkeeping: migrate the record's priority bucket and
    /// publish its new access details, then hand the value back.
    fn touch(&self, record: &Arc<Record<K, V>>) -> V {
        let now = self.clock.now();
        let mut priority = self.priority.lock();
        let previous = record.access();
        priority.remove(&previous, record.key());
        let updated = previous.update(now);
        priority.insert(&updated, record.key().clone());
        record.publish_access(updated);
        record.value().clone()
    }

    /// The admission capacity pass, serialized across lanes so the size
    /// check stays trustworthy while per-key mutations keep flowing
    /// through the indexed-removal paths.
    ///
    /// Sweep-path removals are absent from the audit log; only replacement
    /// evictions are recorded there.
    async fn manage_entries(&self) {
        let _admission = self.admission.lock().await;
        if self.slots.read().len() < self.max_size {
            return;
        }

        // Drop whole expired buckets, oldest insertion first.
        loop {
            let bucket = {
                let mut expiry = self.expiry.lock();
                match expiry.first_time() {
                    Some(time) if self.has_expired(time) => {
                        expiry.pop_front().map(|(_, keys)| keys)
                    }
                    _ => None,
                }
            };
            let Some(keys) = bucket else { break };
            trace!(keys = keys.len(), "sweeping expired bucket");
            for key in keys {
                let removed = self.slots.write().swap_remove(&key);
                let Some(slot) = removed else { continue };
                self.stats.decrement_size();
                if let Ok(record) = slot.await {
                    self.priority.lock().remove(&record.access(), record.key());
                    self.stats.record_expiration();
                }
            }
        }

        if self.slots.read().len() < self.max_size {
            return;
        }

        // Still at capacity: evict the whole lowest-priority bucket.
        let victims = self.priority.lock().pop_front();
        let Some(victims) = victims else { return };
        debug!(victims = victims.len(), "evicting lowest-priority bucket");
        for key in victims {
            let removed = self.slots.write().swap_remove(&key);
            let Some(slot) = removed else { continue };
            self.stats.decrement_size();
            if let Ok(record) = slot.await {
                self.expiry
                    .lock()
                    .remove(record.inserted_at(), record.key());
                self.push_event(
                    EventKind::Eviction(EvictionReason::Replacement),
                    record.snapshot(),
                );
                self.stats.record_eviction();
            }
        }
    }

    fn unindex(&self, record: &Record<K, V>) {
        self.priority.lock().remove(&record.access(), record.key());
        self.expiry
            .lock()
            .remove(record.inserted_at(), record.key());
    }

    fn push_event(&self, kind: EventKind<K, V>, element: RecordSnapshot<K, V>) {
        self.events.append(kind, element, self.clock.now());
    }

    fn has_expired(&self, inserted_at: u64) -> bool {
        let now = self.clock.now();
        Duration::from_nanos(now.saturating_sub(inserted_at)) > self.expiry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn engine_with_store(
        store: Arc<MemoryStore<String, String>>,
    ) -> Arc<Engine<String, String>> {
        let config: CacheConfig<String, String> = CacheConfig::new()
            .max_size(16)
            .backing_store(store)
            .lane_count(2);
        Engine::from_config(config).expect("store is configured")
    }

    #[tokio::test]
    async fn test_missing_store_fails_construction() {
        let config: CacheConfig<String, String> = CacheConfig::new();
        let result = Engine::from_config(config);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_failed_load_tears_down_the_slot() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with_store(store.clone());

        let missing = engine.clone().get("absent".to_string()).await;
        assert!(matches!(missing, Err(CacheError::LoadFailed(_))));
        assert_eq!(engine.len(), 0);

        // Seeding the store afterwards proves the next get loads afresh
        // instead of replaying the failure.
        store.put("absent".to_string(), "found".to_string());
        let found = engine.clone().get("absent".to_string()).await;
        assert_eq!(found.expect("store now holds the key"), "found");
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn test_access_migrates_the_priority_bucket() {
        let store = Arc::new(MemoryStore::new());
        store.put("key".to_string(), "value".to_string());
        let engine = engine_with_store(store);

        engine.clone().get("key".to_string()).await.expect("key loads");
        engine.clone().get("key".to_string()).await.expect("key hits");

        // Two accesses: the record sits in exactly one bucket, under its
        // current details.
        let slot = engine
            .slots
            .read()
            .get("key")
            .cloned()
            .expect("slot is resident");
        let record = slot.await.expect("slot resolved");
        assert_eq!(record.access().access_count, 2);
    }
}
