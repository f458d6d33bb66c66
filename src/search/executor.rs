//! Search execution and orchestration

use super::enhancer::Enhancer;
use super::intent::{infer_category, IntentParser};
use super::models::SearchResults;
use super::ranking::rank;
use crate::context::RequestContext;
use crate::domain::Intent;
use crate::error::{Error, Result};
use crate::fx::PriceConverter;
use crate::gateways::{CatalogProvider, EnrichmentProvider, IntentProvider};
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs a query through intent parsing, catalog fetch, ranking, price
/// localization and enrichment
pub struct SearchOrchestrator {
    parser: IntentParser,
    catalog: Arc<dyn CatalogProvider>,
    enhancer: Option<Enhancer>,
    converter: Option<PriceConverter>,
    metrics: Arc<Metrics>,
}

impl SearchOrchestrator {
    /// Create an orchestrator without enrichment or price localization
    pub fn new(intent: Arc<dyn IntentProvider>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            parser: IntentParser::new(intent),
            catalog,
            enhancer: None,
            converter: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Enrich results with the given provider
    pub fn with_enhancer(mut self, provider: Arc<dyn EnrichmentProvider>) -> Self {
        self.enhancer = Some(Enhancer::new(provider));
        self
    }

    /// Fill ETB prices with the given converter
    pub fn with_price_converter(mut self, converter: PriceConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Share a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Execute a search for `query`
    ///
    /// Only a blank query, a catalog failure or an expired context fail
    /// the call. Intent, localization and enrichment failures degrade the
    /// result instead.
    pub async fn execute(&self, ctx: &RequestContext, query: &str) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }

        self.metrics.inc_search();
        info!(request_id = ctx.request_id(), "Executing search '{}'", query);

        let intent = match self.parser.parse(ctx, query).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(
                    request_id = ctx.request_id(),
                    "Intent parsing via {} failed, searching without filters: {}",
                    self.parser.provider_name(),
                    e
                );
                self.metrics.inc_intent_fallback();
                Intent::empty()
            }
        };

        let keywords = intent
            .keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(query)
            .to_string();

        let mut filters = intent.filters.pruned();
        if filters.category.is_none() {
            if let Some(category) = infer_category(&keywords).or_else(|| infer_category(query)) {
                debug!(request_id = ctx.request_id(), "Inferred category {}", category);
                filters.category = Some(category.to_string());
            }
        }

        let start = Instant::now();
        let fetched = ctx
            .run(self.catalog.fetch_products(ctx, &keywords, &filters))
            .await
            .and_then(|r| r);
        self.metrics.record_provider_call(
            self.catalog.name(),
            start.elapsed().as_millis() as u64,
            fetched.is_ok(),
        );

        let mut products = match fetched {
            Ok(products) => products,
            Err(e) => {
                error!(
                    request_id = ctx.request_id(),
                    "Catalog {} failed: {}",
                    self.catalog.name(),
                    e
                );
                self.metrics.inc_catalog_failure();
                return Err(e);
            }
        };

        debug!(
            request_id = ctx.request_id(),
            "Catalog returned {} products in {:?}",
            products.len(),
            start.elapsed()
        );

        if filters.has_constraints() {
            debug!(request_id = ctx.request_id(), "Keeping catalog order for constrained query");
        } else {
            rank(&mut products);
        }

        if let Some(ref converter) = self.converter {
            if !products.is_empty() {
                let localized = ctx
                    .run(converter.localize(&mut products))
                    .await
                    .and_then(|r| r);
                if let Err(e) = localized {
                    warn!(
                        request_id = ctx.request_id(),
                        "Price localization skipped: {}", e
                    );
                }
            }
        }

        if let Some(ref enhancer) = self.enhancer {
            if !products.is_empty() {
                let enhanced = enhancer.enhance_all(ctx, products, query).await;
                self.metrics.add_enrichment_failures(enhanced.failures as u64);
                products = enhanced.products;
            }
        }

        info!(
            request_id = ctx.request_id(),
            "Search '{}' returned {} products",
            query,
            products.len()
        );

        Ok(SearchResults::new(products))
    }
}
