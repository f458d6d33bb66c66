//! Intent parsing stage

use crate::context::RequestContext;
use crate::domain::Intent;
use crate::error::Result;
use crate::gateways::IntentProvider;
use std::sync::Arc;
use tracing::debug;

/// Keyword fragments mapped to a catalog category, first match wins.
/// Headphone hints come first since "headphone" contains "phone".
const CATEGORY_HINTS: &[(&str, &str)] = &[
    ("earbud", "headphone"),
    ("headphone", "headphone"),
    ("airpods", "headphone"),
    ("phone", "smartphone"),
    ("galaxy", "smartphone"),
    ("ስልክ", "smartphone"),
    ("laptop", "laptop"),
    ("notebook", "laptop"),
    ("macbook", "laptop"),
    ("watch", "watch"),
    ("ሰዓት", "watch"),
];

/// Guess a category from free text
///
/// Only a hint for the catalog; never overrides a category the provider
/// extracted.
pub fn infer_category(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    CATEGORY_HINTS
        .iter()
        .find(|(hint, _)| lower.contains(hint))
        .map(|(_, category)| *category)
}

/// Wraps an [`IntentProvider`] with the request deadline
#[derive(Clone)]
pub struct IntentParser {
    provider: Arc<dyn IntentProvider>,
}

impl IntentParser {
    pub fn new(provider: Arc<dyn IntentProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Parse `query`; errors are left to the caller to absorb
    pub async fn parse(&self, ctx: &RequestContext, query: &str) -> Result<Intent> {
        let intent = ctx.run(self.provider.parse_intent(ctx, query)).await??;
        debug!(
            request_id = ctx.request_id(),
            provider = self.provider.name(),
            "Intent keywords={:?} filters={:?}",
            intent.keywords,
            intent.filters
        );
        Ok(intent)
    }
}
