//! Sharded operation dispatch.
//!
//! Every key maps to one of a fixed set of lanes; a lane is a spawned task
//! draining its queue one operation at a time, to completion. That gives
//! all operations on a key a total order with no overlap, while operations
//! for keys on other lanes proceed in parallel. Keys that share a lane by
//! hash collision serialize incidentally, which costs throughput but never
//! correctness.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::{CacheError, CacheResult};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Fixed pool of sequential execution lanes.
pub(crate) struct LanePool {
    lanes: Vec<mpsc::UnboundedSender<Job>>,
}

impl LanePool {
    /// Spawn `count` lanes (at least one). Requires a running tokio
    /// runtime.
    pub(crate) fn new(count: usize) -> Self {
        let lanes = (0..count.max(1))
            .map(|_| {
                let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
                tokio::spawn(async move {
                    while let Some(job) = rx.recv().await {
                        job.await;
                    }
                });
                tx
            })
            .collect();
        Self { lanes }
    }

    /// Queue `op` on the lane owning `key_hash` and hand back its deferred
    /// result. Queueing happens now, not at first poll, so call order is
    /// submission order; the lane runs `op` to completion whether or not
    /// the deferred is ever awaited.
    pub(crate) fn submit<T, F>(&self, key_hash: u64, op: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: Future<Output = CacheResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // The caller may have dropped the deferred; the operation's
            // side effects still stand.
            let _ = tx.send(op.await);
        });
        let lane = &self.lanes[(key_hash % self.lanes.len() as u64) as usize];
        // A closed lane drops the job, which drops `tx`, which resolves the
        // deferred to Shutdown.
        let _ = lane.send(job);
        Deferred { rx }
    }
}

impl fmt::Debug for LanePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanePool")
            .field("lanes", &self.lanes.len())
            .finish()
    }
}

/// Hash a key for lane selection.
pub(crate) fn key_hash<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// The eventual result of a queued cache operation.
///
/// Returned as soon as the operation is queued; resolves when the
/// operation's lane finishes running it.
pub struct Deferred<T> {
    rx: oneshot::Receiver<CacheResult<T>>,
}

impl<T> Future for Deferred<T> {
    type Output = CacheResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CacheError::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}
