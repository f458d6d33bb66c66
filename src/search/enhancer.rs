//! Concurrent product enrichment
//!
//! One task per product, all spawned before any is awaited, then a full
//! join. Task `i` only ever produces the value for slot `i`, so results are
//! merged by index without locking and the input order survives regardless
//! of completion order. Tasks live in a `JoinSet`; if the caller is dropped
//! mid-join they are aborted rather than left running.

use crate::context::RequestContext;
use crate::domain::Product;
use crate::gateways::EnrichmentProvider;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of enriching a batch
#[derive(Debug, Clone)]
pub struct Enhanced {
    /// Same length and order as the input
    pub products: Vec<Product>,
    /// Slots that kept their original product
    pub failures: usize,
}

#[derive(Clone)]
pub struct Enhancer {
    provider: Arc<dyn EnrichmentProvider>,
}

impl Enhancer {
    pub fn new(provider: Arc<dyn EnrichmentProvider>) -> Self {
        Self { provider }
    }

    /// Enrich every product for `query`
    ///
    /// A failed, cancelled or panicked task leaves its slot unchanged. Every
    /// spawned task is joined before returning, including after the
    /// context is done.
    pub async fn enhance_all(
        &self,
        ctx: &RequestContext,
        mut products: Vec<Product>,
        query: &str,
    ) -> Enhanced {
        // dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        for (index, product) in products.iter().cloned().enumerate() {
            let provider = self.provider.clone();
            let ctx = ctx.clone();
            let query = query.to_string();
            tasks.spawn(async move {
                let language = ctx.language();
                let outcome = ctx
                    .run(provider.enhance(&ctx, &product, &query, language))
                    .await
                    .and_then(|r| r);
                (index, outcome)
            });
        }

        debug!(
            request_id = ctx.request_id(),
            "Spawned {} enrichment tasks",
            tasks.len()
        );

        let mut enhanced_count = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(mut enhanced))) => {
                    let slot = &mut products[index];
                    enhanced.restore_identity(slot);
                    *slot = enhanced;
                    enhanced_count += 1;
                }
                Ok((index, Err(e))) => {
                    warn!(
                        request_id = ctx.request_id(),
                        "Enrichment failed for product {} ({}): {}", index, products[index].id, e
                    );
                }
                Err(e) => {
                    warn!(request_id = ctx.request_id(), "Enrichment task aborted: {}", e);
                }
            }
        }

        let failures = products.len() - enhanced_count;
        Enhanced { products, failures }
    }
}
