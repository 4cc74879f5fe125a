//! # Backed Cache
//!
//! An async, bounded, generic key/value cache that fronts a pluggable
//! backing store, for taking read and write load off that store while
//! keeping memory bounded.
//!
//! ## Features
//!
//! - **Read-through**: a miss loads from the backing store; concurrent
//!   lookups for the same key share one in-flight load
//! - **Write-through or write-back**: persist on every `set`, or defer
//!   persistence entirely
//! - **Pluggable eviction**: recency-based or frequency-based victim
//!   selection under a fixed capacity
//! - **Uniform expiry**: one time-to-live applied to every entry
//! - **Sharded dispatch**: per-key operation ordering over a fixed pool of
//!   lanes, full parallelism across keys
//! - **Audit trail**: an append-only log of loads, writes, overwrites, and
//!   evictions
//! - **Eager warm-up**: preload a key set before the cache is ready
//!
//! ## Quick Start
//!
//! ```no_run
//! use backed_cache::{Cache, CacheConfig, EvictionAlgorithm, MemoryStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> backed_cache::CacheResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.put("config:motd".to_string(), "hello".to_string());
//!
//! let config = CacheConfig::new()
//!     .max_size(10_000)
//!     .expiry_time(Duration::from_secs(300))
//!     .eviction_algorithm(EvictionAlgorithm::Recency)
//!     .backing_store(store)
//!     .eager_keys(["config:motd".to_string()]);
//!
//! let cache: Cache<String, String> = Cache::new(config).await?;
//!
//! // Eagerly loaded at construction: this is a hit.
//! let motd = cache.get("config:motd".to_string()).await?;
//! assert_eq!(motd, "hello");
//!
//! // Inspect the audit trail.
//! for event in cache.events() {
//!     println!("{:?} at {}", event.kind, event.timestamp);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! `get` and `set` queue the operation on the key's lane and return a
//! [`Deferred`] immediately; operations on one key run in submission
//! order, never overlapping, while other keys proceed in parallel. The
//! capacity decision alone is serialized across lanes, so the cache size
//! may transiently overshoot between an admission and the next capacity
//! pass, but never after a completed `set`.

pub mod cache;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod event;
pub mod stats;
pub mod store;

pub use cache::Cache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, EvictionAlgorithm, WritePolicy};
pub use dispatch::Deferred;
pub use entry::{AccessDetails, RecordSnapshot};
pub use error::{CacheError, CacheResult};
pub use event::{CacheEvent, EventKind, EvictionReason};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{BackingStore, MemoryStore, StoreError};

// Internal modules - not part of the public API
pub(crate) mod engine;
pub(crate) mod index;
