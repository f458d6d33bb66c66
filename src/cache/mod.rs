//! Caching module for ShopAlly-RS
//!
//! Provides the shared key/value store used by the rate limiter and the
//! exchange-rate cache, plus a generic read-through helper.

mod read_through;
mod redis_store;
mod store;

pub use read_through::ReadThroughCache;
pub use redis_store::RedisStore;
pub use store::{CacheStore, MemoryStore};

use crate::config::{CacheBackend, CacheSettings};
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the configured store
pub async fn open_store(settings: &CacheSettings) -> Result<Arc<dyn CacheStore>> {
    match settings.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisStore::connect(&settings.redis_url).await?)),
        CacheBackend::Memory => {
            warn!("Using the in-process cache store; counters are not shared between replicas");
            info!("In-process cache capacity: {} entries", settings.max_entries);
            Ok(Arc::new(MemoryStore::with_capacity(settings.max_entries)))
        }
    }
}

/// Cache key for a currency pair, e.g. `fx:USD:ETB`
pub fn fx_key(from: &str, to: &str) -> String {
    format!("fx:{}:{}", from.to_ascii_uppercase(), to.to_ascii_uppercase())
}

/// Cache key holding the request counter of a device
pub fn rate_key(device_id: &str) -> String {
    format!("rate:{}", device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(fx_key("usd", "etb"), "fx:USD:ETB");
        assert_eq!(rate_key("d1"), "rate:d1");
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let settings = CacheSettings::default();
        assert_eq!(settings.backend, CacheBackend::Memory);

        let store = open_store(&settings).await.unwrap();
        assert_eq!(store.incr("rate:d1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_redis_store_with_bad_url_fails() {
        let settings = CacheSettings {
            backend: CacheBackend::Redis,
            redis_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(open_store(&settings).await.is_err());
    }
}
