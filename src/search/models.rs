//! Search request and response models

use crate::domain::Product;
use serde::{Deserialize, Serialize};

/// Products returned for a query, in final order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub products: Vec<Product>,
}

impl SearchResults {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Body of a comparison request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompareRequest {
    pub products: Vec<Product>,
}

/// Inclusive bounds on the number of products a comparison accepts
pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 4;
