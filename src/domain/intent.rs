//! Structured search intent extracted from a free-text query
//!
//! Language models answer with loosely typed JSON. Everything is coerced
//! into [`SearchFilters`] here, at the boundary: aliases are folded, numeric
//! strings are parsed, nulls and empty strings are dropped and unknown keys
//! are ignored. Downstream code only ever sees populated fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Closed set of filters understood by the catalog gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    /// USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_days_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_to_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_no: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// User expressed prices in birr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_etb: Option<bool>,
}

impl SearchFilters {
    /// Whether the query carries price or delivery constraints
    pub fn has_constraints(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some() || self.delivery_days_max.is_some()
    }

    /// Drop blank strings that slipped in through direct construction
    pub fn pruned(mut self) -> Self {
        for field in [
            &mut self.category,
            &mut self.ship_to_country,
            &mut self.target_currency,
            &mut self.target_language,
            &mut self.sort,
        ] {
            if field.as_deref().map_or(false, |s| s.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parsed query intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    /// English keywords to send to the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub filters: SearchFilters,
}

impl Intent {
    /// Intent with no keywords and no filters
    pub fn empty() -> Self {
        Self::default()
    }

    /// Coerce a loosely typed JSON object into an intent
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut intent = Intent::default();
        let f = &mut intent.filters;

        for (key, value) in object {
            match key.as_str() {
                "keywords" => intent.keywords = as_text(value),
                "category" | "category_ids" => {
                    if f.category.is_none() {
                        f.category = as_text(value);
                    }
                }
                "min_price" | "min_sale_price" => f.min_price = f.min_price.or(as_number(value)),
                "max_price" | "max_sale_price" => f.max_price = f.max_price.or(as_number(value)),
                "delivery_days_max" | "delivery_days" => {
                    f.delivery_days_max = f.delivery_days_max.or(as_count(value))
                }
                "ship_to_country" => f.ship_to_country = as_text(value),
                "target_currency" => f.target_currency = as_text(value),
                "target_language" => f.target_language = as_text(value),
                "sort" => f.sort = as_text(value),
                "page_no" => f.page_no = as_count(value),
                "page_size" => f.page_size = as_count(value),
                "is_etb" => f.is_etb = as_flag(value),
                other => debug!("Ignoring unknown intent key: {}", other),
            }
        }

        intent
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite() && *n >= 0.0)
}

fn as_count(value: &Value) -> Option<u32> {
    as_number(value).map(|n| n.round() as u32)
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_nulls_and_empty_strings_are_dropped() {
        let intent = Intent::from_json_object(&object(json!({
            "keywords": "phone",
            "category_ids": null,
            "sort": "",
            "ship_to_country": "  ",
            "min_sale_price": null,
        })));

        assert_eq!(intent.keywords.as_deref(), Some("phone"));
        assert!(intent.filters.is_empty());
    }

    #[test]
    fn test_aliases_and_coercion() {
        let intent = Intent::from_json_object(&object(json!({
            "category_ids": "44",
            "min_sale_price": "1,000",
            "max_sale_price": 1500.5,
            "delivery_days": 5,
            "page_size": "30",
            "is_etb": "false",
            "price_max_ETB": 5000,
        })));

        let f = intent.filters;
        assert_eq!(f.category.as_deref(), Some("44"));
        assert_eq!(f.min_price, Some(1000.0));
        assert_eq!(f.max_price, Some(1500.5));
        assert_eq!(f.delivery_days_max, Some(5));
        assert_eq!(f.page_size, Some(30));
        assert_eq!(f.is_etb, Some(false));
        assert!(f.has_constraints());
    }

    #[test]
    fn test_invalid_numbers_are_dropped() {
        let intent = Intent::from_json_object(&object(json!({
            "min_price": "cheap",
            "max_price": -3,
        })));
        assert!(!intent.filters.has_constraints());
    }

    #[test]
    fn test_pruned_removes_blank_strings() {
        let filters = SearchFilters {
            category: Some(String::new()),
            sort: Some("orders".to_string()),
            ..Default::default()
        }
        .pruned();

        assert_eq!(filters.category, None);
        assert_eq!(filters.sort.as_deref(), Some("orders"));
    }
}
