//! Cache Store Module
//!
//! TTL-keyed in-memory store. Expired entries are dropped lazily on read and
//! by a periodic two-phase sweep: expiry first, then the size bound, oldest
//! write first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{
    CacheCounters, CacheEntry, CacheItemInfo, CacheStats, CreationOrder, SweepReport,
};

/// Store shared between the orchestrator, HTTP handlers and the cleanup task.
pub type SharedCache<V = serde_json::Value> = Arc<RwLock<CacheStore<V>>>;

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore<V = serde_json::Value> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Write order, oldest first
    order: CreationOrder,
    counters: CacheCounters,
    /// Size bound enforced by `sweep`
    max_entries: usize,
    /// TTL for `set` calls that do not pass one
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `max_entries` - Entry count the sweep trims the store back to
    /// * `default_ttl` - Lifetime for entries stored without an explicit TTL
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: CreationOrder::new(),
            counters: CacheCounters::new(),
            max_entries,
            default_ttl,
        }
    }

    /// Wraps the store for sharing across tasks.
    pub fn into_shared(self) -> SharedCache<V> {
        Arc::new(RwLock::new(self))
    }

    // == Set ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// Never fails and never evicts; the size bound is enforced by `sweep`.
    pub fn set(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>) {
        self.set_at(key, data, ttl, current_timestamp_ms());
    }

    /// `set` with an explicit write time.
    pub fn set_at(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>, now: u64) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);

        self.order.record_write(&key);
        self.entries
            .insert(key, CacheEntry::written_at(data, now, ttl));
    }

    // == Get ==
    /// Returns the value if present and fresh.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    pub fn get_at(&mut self, key: &str, now: u64) -> Option<V> {
        if self.evict_if_expired(key, now) {
            self.counters.record_miss();
            return None;
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.counters.record_hit();
                Some(entry.data.clone())
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Same freshness rules as `get`, without cloning the value or touching
    /// the hit/miss counters.
    pub fn has(&mut self, key: &str) -> bool {
        self.has_at(key, current_timestamp_ms())
    }

    pub fn has_at(&mut self, key: &str, now: u64) -> bool {
        !self.evict_if_expired(key, now) && self.entries.contains_key(key)
    }

    // == Lookup ==
    /// Fresh read that leaves expired entries in place.
    ///
    /// Counts a hit or a miss like `get`, but an expired entry stays
    /// available to `get_stale` until the sweep removes it.
    pub fn lookup(&mut self, key: &str) -> Option<V> {
        self.lookup_at(key, current_timestamp_ms())
    }

    pub fn lookup_at(&mut self, key: &str, now: u64) -> Option<V> {
        let data = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.data.clone());

        match data {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        data
    }

    /// Freshness check with no side effects at all.
    pub fn is_fresh(&self, key: &str) -> bool {
        self.is_fresh_at(key, current_timestamp_ms())
    }

    pub fn is_fresh_at(&self, key: &str, now: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Get Stale ==
    /// Reads an entry regardless of expiry.
    ///
    /// Only meant for degraded fallbacks after an upstream failure.
    pub fn get_stale(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).cloned()
    }

    // == Delete ==
    /// Removes an entry, reporting whether one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(current_timestamp_ms())
    }

    pub fn cleanup_expired_at(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.remove(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Enforce Capacity ==
    /// Drops the oldest-written entries until at most `max_entries` remain.
    pub fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.max_entries {
            match self.order.pop_oldest() {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        evicted += 1;
                    }
                }
                None => break,
            }
        }

        self.counters.record_evictions(evicted);
        evicted
    }

    // == Sweep ==
    /// Two-phase cleanup: expiry, then the size bound.
    pub fn sweep(&mut self) -> SweepReport {
        self.sweep_at(current_timestamp_ms())
    }

    pub fn sweep_at(&mut self, now: u64) -> SweepReport {
        let expired = self.cleanup_expired_at(now);
        let evicted = self.enforce_capacity();
        SweepReport { expired, evicted }
    }

    // == Stats ==
    /// Returns counters plus per-item metadata, items ordered oldest first.
    pub fn stats(&self) -> CacheStats {
        let now = current_timestamp_ms();
        let mut items: Vec<CacheItemInfo> = self
            .entries
            .iter()
            .map(|(key, entry)| CacheItemInfo {
                key: key.clone(),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                ttl_remaining_ms: entry.ttl_remaining_ms_at(now),
                expired: entry.is_expired_at(now),
            })
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));

        CacheStats::new(&self.counters, self.max_entries, items)
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes `key` if it is present and expired. Returns true if removed.
    fn evict_if_expired(&mut self, key: &str, now: u64) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));

        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.counters.record_expirations(1);
            debug!(key = %key, "Cache entry expired on read");
        }
        expired
    }
}
