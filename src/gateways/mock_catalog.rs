//! Fixed product fixtures used when no live catalog is configured

use super::traits::CatalogProvider;
use crate::context::RequestContext;
use crate::domain::{Price, Product, SearchFilters};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct MockCatalog;

impl MockCatalog {
    pub fn new() -> Self {
        Self
    }
}

struct Fixture {
    id: &'static str,
    title: &'static str,
    etb: f64,
    usd: f64,
    match_pct: u8,
    rating: f64,
    seller: u32,
    delivery: &'static str,
    description: &'static str,
    highlights: &'static str,
    review: &'static str,
    sold: u64,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        id: "MOCK-123",
        title: "Mock Smartphone - High Quality",
        etb: 4999.0,
        usd: 45.45,
        match_pct: 92,
        rating: 4.6,
        seller: 95,
        delivery: "15-30 days",
        description: "High quality smartphone suitable for everyday use.",
        highlights: "Good camera, solid battery life",
        review: "Customers praise its durability and battery.",
        sold: 1200,
    },
    Fixture {
        id: "MOCK-124",
        title: "Mock Budget Phone",
        etb: 3999.0,
        usd: 36.36,
        match_pct: 88,
        rating: 4.4,
        seller: 90,
        delivery: "12-25 days",
        description: "Affordable smartphone with essential features.",
        highlights: "Long battery life",
        review: "Great value for the price.",
        sold: 2450,
    },
    Fixture {
        id: "MOCK-125",
        title: "Mock Midrange Phone",
        etb: 5499.0,
        usd: 50.0,
        match_pct: 90,
        rating: 4.7,
        seller: 93,
        delivery: "10-20 days",
        description: "Balanced performance and features for most users.",
        highlights: "Fast charging",
        review: "Users like the smooth performance.",
        sold: 1780,
    },
    Fixture {
        id: "MOCK-126",
        title: "Mock Premium Phone",
        etb: 9999.0,
        usd: 90.9,
        match_pct: 94,
        rating: 4.9,
        seller: 98,
        delivery: "7-15 days",
        description: "Premium device with high-end features.",
        highlights: "High refresh rate display",
        review: "Top-notch screen and performance.",
        sold: 950,
    },
    Fixture {
        id: "MOCK-127",
        title: "Mock Accessory Bundle",
        etb: 799.0,
        usd: 7.27,
        match_pct: 80,
        rating: 4.2,
        seller: 85,
        delivery: "10-18 days",
        description: "Budget-friendly accessory kit for phones.",
        highlights: "Budget friendly",
        review: "Great for everyday needs.",
        sold: 5200,
    },
];

fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 22, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

impl From<&Fixture> for Product {
    fn from(f: &Fixture) -> Self {
        Product {
            id: f.id.to_string(),
            title: f.title.to_string(),
            image_url: "https://via.placeholder.com/150".to_string(),
            ai_match_percentage: f.match_pct,
            price: Price {
                etb: f.etb,
                usd: f.usd,
                fx_timestamp: fixture_timestamp(),
            },
            product_rating: f.rating,
            seller_score: f.seller,
            delivery_estimate: f.delivery.to_string(),
            description: f.description.to_string(),
            customer_highlights: f.highlights.to_string(),
            customer_review: f.review.to_string(),
            number_sold: f.sold,
            deeplink_url: "#".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_products(
        &self,
        _ctx: &RequestContext,
        _keywords: &str,
        _filters: &SearchFilters,
    ) -> Result<Vec<Product>> {
        Ok(FIXTURES.iter().map(Product::from).collect())
    }
}
