//! Side-by-side product comparison

use super::models::{MAX_COMPARE, MIN_COMPARE};
use crate::context::RequestContext;
use crate::domain::{Comparison, Product};
use crate::error::{Error, Result};
use crate::gateways::ComparisonProvider;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct CompareProducts {
    provider: Arc<dyn ComparisonProvider>,
    metrics: Arc<Metrics>,
}

impl CompareProducts {
    pub fn new(provider: Arc<dyn ComparisonProvider>, metrics: Arc<Metrics>) -> Self {
        Self { provider, metrics }
    }

    /// Compare between two and four products
    pub async fn execute(&self, ctx: &RequestContext, products: &[Product]) -> Result<Comparison> {
        if !(MIN_COMPARE..=MAX_COMPARE).contains(&products.len()) {
            return Err(Error::InvalidInput(format!(
                "between {} and {} products are required, got {}",
                MIN_COMPARE,
                MAX_COMPARE,
                products.len()
            )));
        }

        self.metrics.inc_comparison();
        info!(
            request_id = ctx.request_id(),
            "Comparing {} products via {}",
            products.len(),
            self.provider.name()
        );

        let start = Instant::now();
        let result = ctx
            .run(self.provider.compare(ctx, products))
            .await
            .and_then(|r| r);
        self.metrics.record_provider_call(
            self.provider.name(),
            start.elapsed().as_millis() as u64,
            result.is_ok(),
        );

        result
    }
}
