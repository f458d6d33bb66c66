//! Product ranking

use crate::domain::Product;

const RATING_WEIGHT: f64 = 0.6;
const SELLER_WEIGHT: f64 = 0.4;

/// Weighted quality score, 0..=100 for in-range inputs
pub fn score(product: &Product) -> f64 {
    RATING_WEIGHT * (product.product_rating / 5.0 * 100.0) + SELLER_WEIGHT * product.seller_score as f64
}

/// Sort by descending score; equal scores keep their relative order
pub fn rank(products: &mut [Product]) {
    products.sort_by(|a, b| score(b).total_cmp(&score(a)));
}
