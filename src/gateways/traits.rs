//! Capabilities of the upstream providers
//!
//! Each capability has a live variant talking to a remote API and a
//! deterministic fixture variant. The variant is picked once when the
//! service is wired, see [`crate::web::AppState::from_settings`].

use crate::context::{Language, RequestContext};
use crate::domain::{Comparison, Intent, Product, SearchFilters};
use crate::error::Result;
use async_trait::async_trait;

/// Turns a free-text query into keywords and filters
#[async_trait]
pub trait IntentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn parse_intent(&self, ctx: &RequestContext, query: &str) -> Result<Intent>;
}

/// Rewrites the text fields of a product for a query and language
///
/// Implementations must leave every non-text field untouched; callers
/// restore them anyway.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn enhance(
        &self,
        ctx: &RequestContext,
        product: &Product,
        query: &str,
        language: Language,
    ) -> Result<Product>;
}

/// Produces side-by-side insights for a handful of products
#[async_trait]
pub trait ComparisonProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn compare(&self, ctx: &RequestContext, products: &[Product]) -> Result<Comparison>;
}

/// Fetches candidate products from a catalog
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_products(
        &self,
        ctx: &RequestContext,
        keywords: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Product>>;
}

/// Supplies currency exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Units of `to` per one unit of `from`
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}
