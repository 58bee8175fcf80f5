//! Short-lived memoization of idempotent reads.
//!
//! Entries expire lazily: an expired entry is evicted by the lookup that
//! finds it. Failed fetches are never stored. Two concurrent misses on the
//! same key both go to the network; there is no in-flight de-duplication.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// A cached value and the instant it stops being served.
#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Keyed TTL cache. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live value for `key`, if it holds a `T`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) if entry.is_live(now) => {
                return match entry.value.downcast_ref::<T>() {
                    Some(value) => Some(value.clone()),
                    None => {
                        tracing::warn!(key = %key, "cached value has a different type");
                        None
                    }
                };
            }
            Some(_) => true,
        };

        // The read guard is released above; removing while holding it would
        // deadlock the shard.
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
            tracing::trace!(key = %key, "cache entry expired");
        }
        None
    }

    pub fn insert<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Serve `key` from the cache, or run `fetch` and store its result for
    /// `ttl`. Errors from `fetch` propagate and leave the cache untouched.
    pub async fn cached_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key) {
            tracing::debug!(key = %key, "cache hit");
            return Ok(value);
        }
        tracing::debug!(key = %key, "cache miss");
        self.refresh(key, ttl, fetch).await
    }

    /// Always run `fetch`; on success overwrite whatever is stored at `key`.
    pub async fn refresh<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = fetch().await?;
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn fetch_counted(calls: &AtomicU32, value: &str) -> Result<String, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_is_served_from_cache() {
        let cache = ResponseCache::new();
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(60);

        let first = cache
            .cached_fetch("tariffs", ttl, || fetch_counted(&calls, "v1"))
            .await
            .unwrap();
        let second = cache
            .cached_fetch("tariffs", ttl, || fetch_counted(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(first, "v1");
        assert_eq!(second, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched_and_evicted() {
        let cache = ResponseCache::new();
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_millis(100);

        cache
            .cached_fetch("status", ttl, || fetch_counted(&calls, "old"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(150)).await;

        assert_eq!(cache.get::<String>("status"), None);
        assert!(cache.is_empty());

        let value = cache
            .cached_fetch("status", ttl, || fetch_counted(&calls, "new"))
            .await
            .unwrap();
        assert_eq!(value, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_stale_exactly_at_expiry() {
        let cache = ResponseCache::new();
        cache.insert("k", 1u32, Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(99)).await;
        assert_eq!(cache.get::<u32>("k"), Some(1));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get::<u32>("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let cache = ResponseCache::new();
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(60);

        let err = cache
            .cached_fetch::<String, _, _, _>("orders", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let value = cache
            .cached_fetch("orders", ttl, || fetch_counted(&calls, "ok"))
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_do_not_share_entries() {
        let cache = ResponseCache::new();
        let ttl = Duration::from_secs(60);
        cache.insert("payments:page=1:limit=20", vec![1, 2], ttl);
        cache.insert("payments:page=2:limit=20", vec![3], ttl);

        assert_eq!(cache.get::<Vec<i32>>("payments:page=1:limit=20"), Some(vec![1, 2]));
        assert_eq!(cache.get::<Vec<i32>>("payments:page=2:limit=20"), Some(vec![3]));

        cache.invalidate_prefix("payments:");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_overwrites_live_entry() {
        let cache = ResponseCache::new();
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(60);

        cache.insert("status", "stale".to_string(), ttl);
        let value = cache
            .refresh("status", ttl, || fetch_counted(&calls, "fresh"))
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(cache.get::<String>("status").as_deref(), Some("fresh"));
    }

    #[test]
    fn type_mismatch_is_a_miss() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let cache = ResponseCache::new();
            cache.insert("k", 5u8, Duration::from_secs(1));
            assert_eq!(cache.get::<String>("k"), None);
            assert!(cache.invalidate("k"));
        });
    }
}
