// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for local storage areas.
//
// Wraps any `LocalStorageArea` and counts primitive calls, bytes moved and
// wall-clock latency. The facade's cache is meant to absorb repeat reads, and
// these counters make that observable.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::backend::LocalStorageArea;
use crate::error::StorageError;

/// Accumulated statistics for a wrapped area.
///
/// All counters are monotonically increasing until [`MeteredArea::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaStats {
    /// Number of `get_item` calls.
    pub get_count: u64,
    /// Number of `set_item` calls.
    pub set_count: u64,
    /// Number of `remove_item` calls.
    pub remove_count: u64,
    /// Number of `clear` calls.
    pub clear_count: u64,
    /// Cumulative latency of all `get_item` calls, in milliseconds.
    pub get_latency_sum_ms: f64,
    /// Cumulative latency of all `set_item` calls, in milliseconds.
    pub set_latency_sum_ms: f64,
    /// Total value bytes returned by `get_item`.
    pub total_bytes_read: u64,
    /// Total value bytes accepted by `set_item`.
    pub total_bytes_written: u64,
}

/// A [`LocalStorageArea`] wrapper that collects operation metrics.
///
/// Clones share both the inner area and the statistics.
///
/// # Example
///
/// ```rust
/// use xel_storage::backend::LocalStorageArea;
/// use xel_storage::memory::InMemoryArea;
/// use xel_storage::metrics::MeteredArea;
///
/// let metered = MeteredArea::new(InMemoryArea::new());
/// metered.set_item("key", "1").unwrap();
/// metered.get_item("key").unwrap();
///
/// let stats = metered.stats();
/// assert_eq!(stats.set_count, 1);
/// assert_eq!(stats.get_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MeteredArea<A: LocalStorageArea> {
    inner: A,
    stats: Arc<Mutex<AreaStats>>,
}

impl<A: LocalStorageArea> MeteredArea<A> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            stats: Arc::new(Mutex::new(AreaStats::default())),
        }
    }

    /// Snapshot of the current statistics.
    pub fn stats(&self) -> AreaStats {
        self.lock().clone()
    }

    /// Reset all statistics to zero.
    pub fn reset_stats(&self) {
        *self.lock() = AreaStats::default();
    }

    /// The wrapped area.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, AreaStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<A: LocalStorageArea> LocalStorageArea for MeteredArea<A> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let start = Instant::now();
        let result = self.inner.get_item(key);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.lock();
        s.get_count += 1;
        s.get_latency_sum_ms += elapsed_ms;
        if let Ok(Some(ref val)) = result {
            s.total_bytes_read += val.len() as u64;
        }

        result
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.inner.set_item(key, value);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.lock();
        s.set_count += 1;
        s.set_latency_sum_ms += elapsed_ms;
        if result.is_ok() {
            s.total_bytes_written += value.len() as u64;
        }

        result
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove_count += 1;
        self.inner.remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear_count += 1;
        self.inner.clear()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryArea;

    #[test]
    fn test_get_increments_count_and_bytes() {
        let metered = MeteredArea::new(InMemoryArea::new());

        metered.set_item("k", "hello").unwrap();
        metered.get_item("k").unwrap();
        metered.get_item("k").unwrap();
        metered.get_item("missing").unwrap();

        let stats = metered.stats();
        assert_eq!(stats.get_count, 3);
        assert_eq!(stats.set_count, 1);
        // Two hits of five bytes each; the miss reads nothing.
        assert_eq!(stats.total_bytes_read, 10);
    }

    #[test]
    fn test_set_increments_bytes_written() {
        let metered = MeteredArea::new(InMemoryArea::new());

        metered.set_item("a", "hello").unwrap();
        metered.set_item("b", "world!").unwrap();

        let stats = metered.stats();
        assert_eq!(stats.set_count, 2);
        assert_eq!(stats.total_bytes_written, 11);
        assert!(stats.set_latency_sum_ms >= 0.0);
    }

    #[test]
    fn test_remove_and_clear_counts() {
        let metered = MeteredArea::new(InMemoryArea::new());

        metered.set_item("k", "v").unwrap();
        metered.remove_item("k").unwrap();
        metered.remove_item("nope").unwrap();
        metered.clear().unwrap();

        let stats = metered.stats();
        assert_eq!(stats.remove_count, 2);
        assert_eq!(stats.clear_count, 1);
        assert!(metered.inner().is_empty());
    }

    #[test]
    fn test_reset_stats() {
        let metered = MeteredArea::new(InMemoryArea::new());
        metered.set_item("a", "1").unwrap();
        metered.get_item("a").unwrap();

        metered.reset_stats();
        assert_eq!(metered.stats(), AreaStats::default());
    }

    #[test]
    fn test_clones_share_stats() {
        let metered = MeteredArea::new(InMemoryArea::new());
        let clone = metered.clone();

        clone.set_item("a", "1").unwrap();
        assert_eq!(metered.stats().set_count, 1);
    }

    #[test]
    fn test_name_delegates_to_inner() {
        let metered = MeteredArea::new(InMemoryArea::new());
        assert_eq!(metered.name(), "in-memory");
    }
}
