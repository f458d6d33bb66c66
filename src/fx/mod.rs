//! Currency conversion for product prices
//!
//! Rates are read through the shared cache store under `fx:<FROM>:<TO>`,
//! so one upstream call serves every request until the entry expires.

use crate::cache::{fx_key, CacheStore, ReadThroughCache};
use crate::domain::Product;
use crate::error::{Error, Result};
use crate::gateways::RateProvider;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

fn parse_rate(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| Error::Fx(format!("unparsable rate {:?} at {}", raw, key)))
}

/// Rate provider answering from the cache store, falling back to a source
pub struct CachedRateProvider {
    source: Arc<dyn RateProvider>,
    cache: ReadThroughCache,
}

impl CachedRateProvider {
    pub fn new(source: Arc<dyn RateProvider>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            source,
            cache: ReadThroughCache::new(store, ttl),
        }
    }

    /// Fetch from the source and overwrite the cached rate
    pub async fn refresh(&self, from: &str, to: &str) -> Result<f64> {
        let key = fx_key(from, to);
        let rate = self.source.get_rate(from, to).await?;
        self.cache
            .store()
            .set(&key, rate.to_string(), Some(self.cache.ttl()))
            .await?;
        debug!("Refreshed {} = {}", key, rate);
        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for CachedRateProvider {
    fn name(&self) -> &str {
        "cached"
    }

    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let key = fx_key(from, to);
        let raw = self
            .cache
            .get_or_fetch(&key, || async {
                self.source.get_rate(from, to).await.map(|r| r.to_string())
            })
            .await?;
        parse_rate(&key, &raw)
    }
}

/// Converts USD prices to ETB
#[derive(Clone)]
pub struct PriceConverter {
    rates: Arc<dyn RateProvider>,
}

impl PriceConverter {
    pub fn new(rates: Arc<dyn RateProvider>) -> Self {
        Self { rates }
    }

    /// Converted amount and the rate used
    pub async fn usd_to_etb(&self, usd: f64) -> Result<(f64, f64)> {
        let rate = self.rates.get_rate("USD", "ETB").await?;
        Ok((usd * rate, rate))
    }

    /// Fill the ETB price of every product from its USD price
    ///
    /// Returns the rate used. Products are untouched on error.
    pub async fn localize(&self, products: &mut [Product]) -> Result<f64> {
        let rate = self.rates.get_rate("USD", "ETB").await?;
        let now = Utc::now();
        for product in products.iter_mut() {
            product.price.etb = product.price.usd * rate;
            product.price.fx_timestamp = now;
        }
        Ok(rate)
    }
}

/// Convert using only the cached USD->ETB rate, never calling upstream
pub async fn usd_to_etb_from_cache(store: &dyn CacheStore, usd: f64) -> Result<(f64, f64)> {
    let key = fx_key("USD", "ETB");
    let raw = store
        .get(&key)
        .await?
        .ok_or_else(|| Error::Fx(format!("{} not found in cache", key)))?;
    let rate = parse_rate(&key, &raw)?;
    Ok((usd * rate, rate))
}

/// Refresh USD->ETB every `interval` until the runtime shuts down
pub fn spawn_warmer(rates: Arc<CachedRateProvider>, interval: Duration) -> tokio::task::JoinHandle<()> {
    info!("FX warmer refreshing USD->ETB every {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = rates.refresh("USD", "ETB").await {
                warn!("FX warm-up failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::domain::Price;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRate {
        rate: f64,
        calls: AtomicUsize,
    }

    impl FixedRate {
        fn new(rate: f64) -> Arc<Self> {
            Arc::new(Self {
                rate,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RateProvider for FixedRate {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rate)
        }
    }

    struct FailingRate;

    #[async_trait]
    impl RateProvider for FailingRate {
        fn name(&self) -> &str {
            "failing"
        }

        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64> {
            Err(Error::upstream("fixed", "down"))
        }
    }

    #[tokio::test]
    async fn test_usd_to_etb() {
        let converter = PriceConverter::new(FixedRate::new(56.5));
        let (etb, rate) = converter.usd_to_etb(10.0).await.unwrap();
        assert_eq!(etb, 565.0);
        assert_eq!(rate, 56.5);
    }

    #[tokio::test]
    async fn test_converter_propagates_rate_error() {
        let converter = PriceConverter::new(Arc::new(FailingRate));
        assert!(converter.usd_to_etb(10.0).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_rate_fetched_once_per_ttl() {
        let source = FixedRate::new(56.5);
        let store = Arc::new(MemoryStore::new());
        let cached = CachedRateProvider::new(source.clone(), store.clone(), Duration::from_secs(60));

        assert_eq!(cached.get_rate("usd", "etb").await.unwrap(), 56.5);
        assert_eq!(cached.get_rate("USD", "ETB").await.unwrap(), 56.5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("fx:USD:ETB").await.unwrap().as_deref(), Some("56.5"));

        tokio::time::advance(Duration::from_secs(61)).await;
        cached.get_rate("USD", "ETB").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_cached_rate_is_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("fx:USD:ETB", "abc".to_string(), None).await.unwrap();
        let cached = CachedRateProvider::new(FixedRate::new(1.0), store, Duration::from_secs(60));

        assert!(matches!(cached.get_rate("USD", "ETB").await, Err(Error::Fx(_))));
    }

    #[tokio::test]
    async fn test_from_cache() {
        let store = MemoryStore::new();
        assert!(matches!(
            usd_to_etb_from_cache(&store, 1.0).await,
            Err(Error::Fx(_))
        ));

        store.set("fx:USD:ETB", "56.5".to_string(), None).await.unwrap();
        let (etb, rate) = usd_to_etb_from_cache(&store, 10.0).await.unwrap();
        assert_eq!((etb, rate), (565.0, 56.5));

        store.set("fx:USD:ETB", "n/a".to_string(), None).await.unwrap();
        assert!(usd_to_etb_from_cache(&store, 10.0).await.is_err());
    }

    #[tokio::test]
    async fn test_localize_fills_etb() {
        let converter = PriceConverter::new(FixedRate::new(50.0));
        let mut products = vec![Product {
            price: Price {
                usd: 2.0,
                ..Default::default()
            },
            ..Product::new("A", "a")
        }];

        let rate = converter.localize(&mut products).await.unwrap();
        assert_eq!(rate, 50.0);
        assert_eq!(products[0].price.etb, 100.0);
        assert_eq!(products[0].price.usd, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmer_populates_cache() {
        let store = Arc::new(MemoryStore::new());
        let cached = Arc::new(CachedRateProvider::new(
            FixedRate::new(57.0),
            store.clone(),
            Duration::from_secs(3600),
        ));

        let handle = spawn_warmer(cached, Duration::from_secs(60));
        // first tick fires immediately
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.get("fx:USD:ETB").await.unwrap().as_deref(), Some("57"));
        handle.abort();
    }
}
