//! Cache Sweep Task
//!
//! Background task that periodically runs the store's two-phase sweep:
//! expired entries first, then the oldest entries beyond the size bound.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that sweeps the cache every `interval`.
///
/// The sweep only removes entries, so it may interleave arbitrarily with
/// reads and writes. Abort the returned handle to stop the task during
/// shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheStore::new(500, Duration::from_secs(300)).into_shared();
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting cache sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let (report, remaining) = {
                let mut cache_guard = cache.write().await;
                let report = cache_guard.sweep();
                (report, cache_guard.len())
            };

            if report.total() > 0 {
                info!(
                    expired = report.expired,
                    evicted = report.evicted,
                    remaining,
                    "Cache sweep removed entries"
                );
            } else {
                debug!(remaining, "Cache sweep: nothing to remove");
            }
        }
    })
}
