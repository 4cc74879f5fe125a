//! Error types for the cache.
//!
//! This module defines the error type covering the failure modes of cache
//! operations, avoiding panics in favor of explicit error handling.

use std::fmt;

/// The main error type for cache operations.
///
/// Load failures are broadcast to every waiter sharing the same in-flight
/// load, so the type is `Clone` and carries owned message strings rather
/// than source errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backing store could not produce a value for a key.
    LoadFailed(String),

    /// The backing store rejected a write-through persist.
    PersistFailed(String),

    /// The cache could not be constructed from the given configuration.
    Configuration(String),

    /// The engine was dropped while the operation was still queued.
    Shutdown,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::LoadFailed(msg) => write!(f, "backing store load failed: {}", msg),
            CacheError::PersistFailed(msg) => write!(f, "backing store persist failed: {}", msg),
            CacheError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            CacheError::Shutdown => write!(f, "cache engine shut down"),
        }
    }
}

impl std::error::Error for CacheError {}

/// A specialized Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::LoadFailed("connection refused".to_string());
        assert_eq!(
            format!("{}", err),
            "backing store load failed: connection refused"
        );

        let err = CacheError::Configuration("no backing store specified".to_string());
        assert_eq!(
            format!("{}", err),
            "configuration error: no backing store specified"
        );

        assert_eq!(format!("{}", CacheError::Shutdown), "cache engine shut down");
    }

    #[test]
    fn test_error_is_cloneable() {
        let err = CacheError::LoadFailed("boom".to_string());
        let copy = err.clone();
        assert_eq!(err, copy);
    }
}
