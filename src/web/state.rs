//! Application state shared across handlers

use crate::cache::CacheStore;
use crate::config::{CatalogBackend, LlmBackend, Settings};
use crate::fx::{CachedRateProvider, PriceConverter};
use crate::gateways::{
    AliExpress, CatalogProvider, ComparisonProvider, EnrichmentProvider, Gemini, HttpRateProvider,
    IntentProvider, MockCatalog, MockLlm,
};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::search::{CompareProducts, SearchOrchestrator};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search pipeline
    pub search: Arc<SearchOrchestrator>,
    /// Comparison use case
    pub compare: Arc<CompareProducts>,
    /// Per-device limiter, absent when disabled
    pub limiter: Option<Arc<RateLimiter>>,
    /// Exchange rates, present when prices are localized
    pub rates: Option<Arc<CachedRateProvider>>,
    pub metrics: Arc<Metrics>,
}

struct LlmProviders {
    intent: Arc<dyn IntentProvider>,
    enrichment: Arc<dyn EnrichmentProvider>,
    comparison: Arc<dyn ComparisonProvider>,
}

impl LlmProviders {
    fn from_one<P>(provider: Arc<P>) -> Self
    where
        P: IntentProvider + EnrichmentProvider + ComparisonProvider + 'static,
    {
        Self {
            intent: provider.clone(),
            enrichment: provider.clone(),
            comparison: provider,
        }
    }
}

impl AppState {
    /// Assemble state from already wired parts
    pub fn new(
        settings: Settings,
        search: SearchOrchestrator,
        compare: CompareProducts,
        limiter: Option<RateLimiter>,
    ) -> Self {
        let metrics = search.metrics().clone();
        Self {
            settings: Arc::new(settings),
            search: Arc::new(search),
            compare: Arc::new(compare),
            limiter: limiter.map(Arc::new),
            rates: None,
            metrics,
        }
    }

    /// Wire providers, pipeline and limiter as configured
    ///
    /// Provider variants are chosen here once; nothing switches per call.
    pub fn from_settings(
        settings: Settings,
        client: HttpClient,
        store: Arc<dyn CacheStore>,
    ) -> anyhow::Result<Self> {
        let metrics = Arc::new(Metrics::new());

        let llm = match settings.llm.provider {
            LlmBackend::Mock => LlmProviders::from_one(Arc::new(MockLlm::new())),
            LlmBackend::Gemini => {
                LlmProviders::from_one(Arc::new(Gemini::new(client.clone(), &settings.llm)?))
            }
        };

        let catalog: Arc<dyn CatalogProvider> = match settings.catalog.provider {
            CatalogBackend::Mock => Arc::new(MockCatalog::new()),
            CatalogBackend::Aliexpress => {
                Arc::new(AliExpress::new(client.clone(), &settings.catalog)?)
            }
        };
        info!(
            "Providers: llm={} catalog={}",
            llm.intent.name(),
            catalog.name()
        );

        // fixture products already carry ETB prices
        let rates = (settings.search.localize_prices
            && settings.catalog.provider == CatalogBackend::Aliexpress)
            .then(|| {
                Arc::new(CachedRateProvider::new(
                    Arc::new(HttpRateProvider::new(client.clone(), &settings.fx)),
                    store.clone(),
                    settings.fx.cache_ttl(),
                ))
            });

        let mut search =
            SearchOrchestrator::new(llm.intent, catalog).with_metrics(metrics.clone());
        if settings.search.enrich_results {
            search = search.with_enhancer(llm.enrichment);
        }
        if let Some(ref rates) = rates {
            search = search.with_price_converter(PriceConverter::new(rates.clone()));
        }

        let compare = CompareProducts::new(llm.comparison, metrics.clone());

        let limiter = settings.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                store.clone(),
                settings.rate_limit.limit,
                settings.rate_limit.window(),
            ))
        });

        Ok(Self {
            settings: Arc::new(settings),
            search: Arc::new(search),
            compare: Arc::new(compare),
            limiter,
            rates,
            metrics,
        })
    }
}
