//! Deterministic stand-in for the language model

use super::traits::{ComparisonProvider, EnrichmentProvider, IntentProvider};
use crate::context::{Language, RequestContext};
use crate::domain::{Comparison, Intent, Product, ProductComparison, Synthesis};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockLlm;

impl MockLlm {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntentProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn parse_intent(&self, _ctx: &RequestContext, _query: &str) -> Result<Intent> {
        let mut intent = Intent::empty();
        intent.filters.category = Some("smartphone".to_string());
        Ok(intent)
    }
}

#[async_trait]
impl EnrichmentProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn enhance(
        &self,
        _ctx: &RequestContext,
        product: &Product,
        query: &str,
        language: Language,
    ) -> Result<Product> {
        let mut enhanced = product.clone();
        enhanced.summary_bullets = match language {
            Language::Am => vec![
                format!("ለ\"{}\" ተስማሚ", query.trim()),
                format!("ደረጃ {:.1}/5", product.product_rating),
            ],
            Language::En => vec![
                format!("Matches \"{}\"", query.trim()),
                format!("Rated {:.1}/5", product.product_rating),
            ],
        };
        if !product.delivery_estimate.is_empty() {
            enhanced.summary_bullets.push(product.delivery_estimate.clone());
        }
        Ok(enhanced)
    }
}

#[async_trait]
impl ComparisonProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compare(&self, ctx: &RequestContext, products: &[Product]) -> Result<Comparison> {
        if products.is_empty() {
            return Err(Error::InvalidInput(
                "at least one product is required".to_string(),
            ));
        }

        // first of the cheapest wins
        let best = products
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| {
                if p.price.usd < products[best].price.usd {
                    i
                } else {
                    best
                }
            });

        let (pros, cons): (&[&str], &[&str]) = match ctx.language() {
            Language::Am => (&["መልካም ዋጋ", "ጥሩ እውቅና"], &["አንዳንድ መለዋወጫዎች ላይካተቱ ይችላሉ"]),
            Language::En => (&["Good price", "Decent rating"], &["May lack accessories"]),
        };

        let features: BTreeMap<String, String> = [("Screen Type", "Unknown"), ("Processor", "Unknown")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let comparison = products
            .iter()
            .enumerate()
            .map(|(i, product)| ProductComparison {
                product: product.clone(),
                synthesis: Synthesis {
                    pros: pros.iter().map(|s| s.to_string()).collect(),
                    cons: cons.iter().map(|s| s.to_string()).collect(),
                    is_best_value: i == best,
                    features: features.clone(),
                },
            })
            .collect();

        Ok(Comparison { comparison })
    }
}
