//! In-memory caching layer for upstream lookups

mod api;

pub use api::{ApiCaches, CacheConfig};

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cached item with expiration
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Thread-safe key/value cache where every entry lives for a fixed TTL.
///
/// Expired entries are never handed out, even before the sweeper has
/// physically removed them. Entries are replaced on `set`, never mutated.
pub struct TtlCache<K, V> {
    name: String,
    ttl: Duration,
    values: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache
    pub fn new(name: &str, ttl: Duration) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a value if present and not expired
    pub fn get(&self, key: &K) -> Option<V> {
        let values = self.values.read().ok()?;
        let entry = values.get(key)?;

        if entry.is_expired_at(Instant::now()) {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    /// Insert or replace a value, restarting its TTL
    pub fn set(&self, key: K, value: V) {
        if let Ok(mut values) = self.values.write() {
            values.insert(
                key,
                CacheEntry {
                    value,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let Ok(mut values) = self.values.write() else {
            return 0;
        };
        let now = Instant::now();
        let before = values.len();
        values.retain(|_, entry| !entry.is_expired_at(now));
        before - values.len()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawn the background sweep. It runs every `interval` until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).sweep_loop(interval, cancel))
    }

    async fn sweep_loop(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        if interval.is_zero() {
            warn!("cache cleanup disabled for {}: zero interval", self.name);
            return;
        }

        debug!("cache cleanup started for: {}", self.name);
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.cleanup();
                    if removed > 0 {
                        debug!(cache = %self.name, removed, "Evicted expired entries");
                    }
                }
            }
        }

        debug!("cache cleanup stopped for: {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TtlCache<u64, String> {
        TtlCache::new("TestCache", Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl() {
        let cache = cache();
        cache.set(1, "one".to_string());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&1).as_deref(), Some("one"));
        assert_eq!(cache.get(&2), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_hidden_before_sweep() {
        let cache = cache();
        cache.set(1, "one".to_string());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(cache.get(&1), None);
        // still physically stored until a cleanup runs
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_and_restarts_ttl() {
        let cache = cache();
        cache.set(1, "old".to_string());
        tokio::time::advance(Duration::from_secs(50)).await;
        cache.set(1, "new".to_string());
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(cache.get(&1).as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_and_stops_on_cancel() {
        let cache = Arc::new(cache());
        let cancel = CancellationToken::new();
        cache.set(1, "one".to_string());

        let handle = cache.spawn_sweeper(Duration::from_secs(90), cancel.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        cache.set(2, "two".to_string());

        // first sweep at t=90: key 1 expired at t=60, key 2 lives until t=90
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), None);

        cancel.cancel();
        handle.await.unwrap();
    }
}
