//! Read-through helper over a [`CacheStore`]

use super::CacheStore;
use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Serves values from the store and refills it from a source on miss
///
/// Concurrent misses for the same key are not coalesced: each caller that
/// misses runs its own fetch.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Cached value for `key`, or the result of `fetch` stored with the TTL
    ///
    /// Store read failures propagate. A failed write after a successful
    /// fetch is only logged, the fresh value is still returned.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(value) = self.store.get(key).await? {
            debug!("Cache hit for {}", key);
            return Ok(value);
        }

        debug!("Cache miss for {}, fetching from source", key);
        let value = fetch().await?;

        if let Err(e) = self.store.set(key, value.clone(), Some(self.ttl)).await {
            warn!("Failed to populate cache for {}: {}", key, e);
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> std::future::Ready<Result<String>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_then_single_refresh_after() {
        let store = Arc::new(MemoryStore::new());
        let cache = ReadThroughCache::new(store.clone(), Duration::from_secs(60));
        store
            .set("k", "v1".to_string(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let value = cache
            .get_or_fetch("k", counting_fetch(&calls, "v2"))
            .await
            .unwrap();
        assert_eq!(value, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(61)).await;

        let value = cache
            .get_or_fetch("k", counting_fetch(&calls, "v2"))
            .await
            .unwrap();
        assert_eq!(value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // refreshed value is cached again
        let value = cache
            .get_or_fetch("k", counting_fetch(&calls, "v3"))
            .await
            .unwrap();
        assert_eq!(value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let cache = ReadThroughCache::new(store.clone(), Duration::from_secs(60));

        let result = cache
            .get_or_fetch("k", || async { Err(Error::Fx("down".to_string())) })
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
