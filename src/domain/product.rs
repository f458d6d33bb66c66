//! Product and comparison models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price in both supported currencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Price {
    pub etb: f64,
    pub usd: f64,
    /// When the ETB amount was derived from the USD amount
    pub fx_timestamp: DateTime<Utc>,
}

/// A catalog product as returned to clients
///
/// Identity, price, quality and logistics fields come from the catalog and
/// never change after fetch. Text fields and the match percentage are the
/// only ones enrichment may rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub ai_match_percentage: u8,
    pub price: Price,
    /// 0..=5
    pub product_rating: f64,
    /// 0..=100
    pub seller_score: u32,
    pub seller_name: String,
    pub delivery_estimate: String,
    pub description: String,
    pub customer_highlights: String,
    pub customer_review: String,
    pub number_sold: u64,
    pub summary_bullets: Vec<String>,
    pub deeplink_url: String,
    pub tax_rate: f64,
    pub discount: f64,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Copy every non-text field from `original` onto `self`
    pub fn restore_identity(&mut self, original: &Product) {
        self.id = original.id.clone();
        self.image_url = original.image_url.clone();
        self.price = original.price.clone();
        self.product_rating = original.product_rating;
        self.seller_score = original.seller_score;
        self.seller_name = original.seller_name.clone();
        self.delivery_estimate = original.delivery_estimate.clone();
        self.number_sold = original.number_sold;
        self.deeplink_url = original.deeplink_url.clone();
        self.tax_rate = original.tax_rate;
        self.discount = original.discount;
    }

    /// Whether `other` has the same non-text fields
    pub fn same_identity(&self, other: &Product) -> bool {
        self.id == other.id
            && self.image_url == other.image_url
            && self.price == other.price
            && self.product_rating == other.product_rating
            && self.seller_score == other.seller_score
            && self.seller_name == other.seller_name
            && self.delivery_estimate == other.delivery_estimate
            && self.number_sold == other.number_sold
            && self.deeplink_url == other.deeplink_url
            && self.tax_rate == other.tax_rate
            && self.discount == other.discount
    }
}

/// Comparison insights for one product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Synthesis {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub is_best_value: bool,
    pub features: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductComparison {
    pub product: Product,
    pub synthesis: Synthesis,
}

/// Side-by-side comparison of 2..=4 products
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comparison {
    pub comparison: Vec<ProductComparison>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product {
            id: "A-1".to_string(),
            title: "Phone".to_string(),
            image_url: "https://img/1.jpg".to_string(),
            price: Price {
                etb: 5650.0,
                usd: 100.0,
                fx_timestamp: Utc::now(),
            },
            product_rating: 4.5,
            seller_score: 90,
            delivery_estimate: "7 days".to_string(),
            number_sold: 10,
            deeplink_url: "https://shop/1".to_string(),
            tax_rate: 0.1,
            discount: 5.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_restore_identity_keeps_text() {
        let original = sample();
        let mut rewritten = Product {
            id: "forged".to_string(),
            title: "Better phone".to_string(),
            description: "Shiny".to_string(),
            seller_score: 1,
            ..Default::default()
        };

        rewritten.restore_identity(&original);

        assert!(rewritten.same_identity(&original));
        assert_eq!(rewritten.title, "Better phone");
        assert_eq!(rewritten.description, "Shiny");
    }

    #[test]
    fn test_product_json_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["imageUrl"], "https://img/1.jpg");
        assert_eq!(json["sellerScore"], 90);
        assert!(json["price"].get("fxTimestamp").is_some());
    }

    #[test]
    fn test_product_deserializes_partial_json() {
        let p: Product = serde_json::from_str(r#"{"id":"X","title":"T"}"#).unwrap();
        assert_eq!(p.id, "X");
        assert_eq!(p.seller_score, 0);
        assert!(p.summary_bullets.is_empty());
    }
}
