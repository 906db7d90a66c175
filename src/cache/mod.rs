//! Cache Module
//!
//! Provides the in-memory TTL store, its eviction bookkeeping and cache key
//! construction.

mod entry;
mod key;
mod order;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use key::create_cache_key;
pub use order::CreationOrder;
pub use stats::{CacheCounters, CacheItemInfo, CacheStats, SweepReport};
pub use store::{CacheStore, SharedCache};
