//! Upstream providers: language model, product catalog and exchange rates

mod aliexpress;
mod exchange_rate;
mod gemini;
mod json;
mod mock_catalog;
mod mock_llm;
mod traits;

pub use aliexpress::{map_products, sign, AliExpress};
pub use exchange_rate::HttpRateProvider;
pub use gemini::{is_blocked_query, match_percentage, Gemini};
pub use json::extract_object;
pub use mock_catalog::MockCatalog;
pub use mock_llm::MockLlm;
pub use traits::{
    CatalogProvider, ComparisonProvider, EnrichmentProvider, IntentProvider, RateProvider,
};
