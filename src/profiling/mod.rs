//! Lightweight profiling module - cumulative counters since the pager was created
//!
//! Atomic counters for the load pipeline of a single pager.
//! Fire-and-forget updates, no blocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Profiling statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagerStats {
    // Loads
    pub loads_started: u64,
    pub loads_cancelled: u64,
    pub loads_failed: u64,
    pub loads_abandoned: u64,

    // Merges
    pub pages_inserted: u64,
    pub pages_replaced: u64,
    pub items_merged: u64,

    // Completions
    pub stale_completions: u64,

    /// Loads downgraded to network-only because nothing was cached
    pub cache_bypasses: u64,

    pub uptime_secs: u64,
}

impl PagerStats {
    /// Average number of visible items per merged page
    #[inline]
    pub fn avg_page_fill(&self) -> u64 {
        let pages = self.pages_inserted + self.pages_replaced;
        if pages > 0 {
            self.items_merged / pages
        } else {
            0
        }
    }
}

/// Profiler - lock-free metric tracking
#[derive(Debug)]
pub struct Profiler {
    loads_started: AtomicU64,
    loads_cancelled: AtomicU64,
    loads_failed: AtomicU64,
    loads_abandoned: AtomicU64,
    pages_inserted: AtomicU64,
    pages_replaced: AtomicU64,
    items_merged: AtomicU64,
    stale_completions: AtomicU64,
    cache_bypasses: AtomicU64,
    start_time: Instant,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            loads_started: AtomicU64::new(0),
            loads_cancelled: AtomicU64::new(0),
            loads_failed: AtomicU64::new(0),
            loads_abandoned: AtomicU64::new(0),
            pages_inserted: AtomicU64::new(0),
            pages_replaced: AtomicU64::new(0),
            items_merged: AtomicU64::new(0),
            stale_completions: AtomicU64::new(0),
            cache_bypasses: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get current statistics snapshot
    pub fn stats(&self) -> PagerStats {
        PagerStats {
            loads_started: self.loads_started.load(Ordering::Relaxed),
            loads_cancelled: self.loads_cancelled.load(Ordering::Relaxed),
            loads_failed: self.loads_failed.load(Ordering::Relaxed),
            loads_abandoned: self.loads_abandoned.load(Ordering::Relaxed),
            pages_inserted: self.pages_inserted.load(Ordering::Relaxed),
            pages_replaced: self.pages_replaced.load(Ordering::Relaxed),
            items_merged: self.items_merged.load(Ordering::Relaxed),
            stale_completions: self.stale_completions.load(Ordering::Relaxed),
            cache_bypasses: self.cache_bypasses.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn record_load_started(&self) {
        self.loads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.loads_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.loads_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self, replaced: bool, items: usize) {
        if replaced {
            self.pages_replaced.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pages_inserted.fetch_add(1, Ordering::Relaxed);
        }
        self.items_merged.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn record_stale_completion(&self) {
        self.stale_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_bypass(&self) {
        self.cache_bypasses.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_counters() {
        let profiler = Profiler::new();
        profiler.record_merge(false, 20);
        profiler.record_merge(false, 5);
        profiler.record_merge(true, 20);

        let stats = profiler.stats();
        assert_eq!(stats.pages_inserted, 2);
        assert_eq!(stats.pages_replaced, 1);
        assert_eq!(stats.items_merged, 45);
        assert_eq!(stats.avg_page_fill(), 15);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(Profiler::new().stats().avg_page_fill(), 0);
    }
}
