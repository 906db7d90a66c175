//! Cache Statistics Module
//!
//! Tracks cache performance counters and builds the inspection snapshot
//! returned by `CacheStore::stats`.

use serde::Serialize;

// == Cache Counters ==
/// Running counters kept by the store.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheCounters {
    /// Fresh reads
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped by the size bound
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Item Info ==
/// Per-entry metadata exposed for debugging.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheItemInfo {
    pub key: String,
    /// Unix ms
    pub created_at: u64,
    /// Unix ms
    pub expires_at: u64,
    /// Remaining lifetime in ms, 0 when stale
    pub ttl_remaining_ms: u64,
    pub expired: bool,
}

// == Cache Stats ==
/// Snapshot of the store: size, bound, counters and every item.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
    pub items: Vec<CacheItemInfo>,
}

impl CacheStats {
    pub fn new(counters: &CacheCounters, max_size: usize, items: Vec<CacheItemInfo>) -> Self {
        Self {
            size: items.len(),
            max_size,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            hit_rate: counters.hit_rate(),
            items,
        }
    }
}

// == Sweep Report ==
/// Outcome of one two-phase cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Removed because expired
    pub expired: usize,
    /// Removed to get back under the size bound
    pub evicted: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.expired + self.evicted
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = CacheCounters::new();
        assert_eq!(counters.hits, 0);
        assert_eq!(counters.misses, 0);
        assert_eq!(counters.evictions, 0);
        assert_eq!(counters.expirations, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheCounters::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_evictions_and_expirations() {
        let mut counters = CacheCounters::new();
        counters.record_evictions(2);
        counters.record_evictions(1);
        counters.record_expirations(4);
        assert_eq!(counters.evictions, 3);
        assert_eq!(counters.expirations, 4);
    }

    #[test]
    fn test_stats_snapshot() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_miss();

        let items = vec![CacheItemInfo {
            key: "k".to_string(),
            created_at: 1,
            expires_at: 2,
            ttl_remaining_ms: 0,
            expired: true,
        }];
        let stats = CacheStats::new(&counters, 4, items);

        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 4);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_sweep_report_total() {
        let report = SweepReport {
            expired: 2,
            evicted: 3,
        };
        assert_eq!(report.total(), 5);
    }
}
