//! The logical clock that timestamps every record, access, and event.
//!
//! The engine never reads time directly; it goes through a [`Clock`] so
//! that expiry behavior stays deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Supplies the engine with timestamps, in nanoseconds.
///
/// Timestamps only need to be monotonically non-decreasing relative to each
/// other; the engine never interprets them as calendar time.
pub trait Clock: Send + Sync {
    /// The current time in nanoseconds.
    fn now(&self) -> u64;
}

/// The default clock: wall-clock nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64
    }
}

/// A clock that only moves when told to.
///
/// Useful for exercising expiry and eviction ordering without sleeping:
///
/// ```
/// use backed_cache::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), 0);
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(clock.now(), 1_000_000_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at `nanos`.
    pub fn starting_at(nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_manual_clock_is_inert_until_advanced() {
        let clock = ManualClock::starting_at(42);
        assert_eq!(clock.now(), 42);
        assert_eq!(clock.now(), 42);

        clock.advance(Duration::from_nanos(8));
        assert_eq!(clock.now(), 50);

        clock.set(7);
        assert_eq!(clock.now(), 7);
    }
}
