//! AliExpress affiliate product search
//!
//! Requests are signed GET calls against the sync endpoint. Both the SG
//! sync envelope and the older `resp_result` envelope are understood.

use super::traits::CatalogProvider;
use crate::config::{CatalogSettings, SignMethod};
use crate::context::RequestContext;
use crate::domain::{Price, Product, SearchFilters};
use crate::error::{Error, Result};
use crate::network::{preview, ApiRequest, HttpClient};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const PROVIDER: &str = "aliexpress";
const METHOD: &str = "aliexpress.affiliate.product.query";

const SG_PRODUCTS: &str = "/aliexpress_affiliate_product_query_response/resp_result/result/products/product";
const LEGACY_PRODUCTS: &str = "/resp_result/result/products";

/// AliExpress catalog client
pub struct AliExpress {
    client: HttpClient,
    base_url: Url,
    app_key: String,
    app_secret: String,
    sign_method: SignMethod,
    page_size: u32,
    timeout: Duration,
}

impl AliExpress {
    pub fn new(client: HttpClient, settings: &CatalogSettings) -> Result<Self> {
        let base_url = Url::parse(settings.base_url.trim()).map_err(|e| {
            Error::upstream(PROVIDER, format!("invalid base url {}: {}", settings.base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            app_key: settings.app_key.clone(),
            app_secret: settings.app_secret.clone(),
            sign_method: settings.sign_method,
            page_size: settings.page_size,
            timeout: Duration::from_secs_f64(settings.timeout),
        })
    }

    /// Unsigned request parameters for a query
    fn build_params(&self, keywords: &str, filters: &SearchFilters) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("method".to_string(), METHOD.to_string());
        params.insert("app_key".to_string(), self.app_key.clone());
        params.insert(
            "timestamp".to_string(),
            Utc::now().timestamp_millis().to_string(),
        );
        params.insert("sign_method".to_string(), "sha256".to_string());
        params.insert("keywords".to_string(), keywords.trim().to_string());
        params.insert(
            "page_no".to_string(),
            filters.page_no.unwrap_or(1).to_string(),
        );
        params.insert(
            "page_size".to_string(),
            filters.page_size.unwrap_or(self.page_size).to_string(),
        );

        let mapped = [
            ("category_ids", filters.category.clone()),
            ("min_sale_price", filters.min_price.map(|p| p.to_string())),
            ("max_sale_price", filters.max_price.map(|p| p.to_string())),
            ("delivery_days", filters.delivery_days_max.map(|d| d.to_string())),
            ("target_currency", filters.target_currency.clone()),
            ("target_language", filters.target_language.clone()),
            ("ship_to_country", filters.ship_to_country.clone()),
            ("sort", filters.sort.clone()),
        ];

        for (key, value) in mapped {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                params.insert(key.to_string(), value);
            }
        }

        params
    }
}

/// Signature over the sorted parameters, uppercase hex
///
/// Keys are concatenated with their values in key order; empty values are
/// skipped.
pub fn sign(params: &BTreeMap<String, String>, secret: &str, method: SignMethod) -> Result<String> {
    let unsigned: String = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}{}", k, v))
        .collect();

    let signature = match method {
        SignMethod::HmacSha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
                .map_err(|e| Error::upstream(PROVIDER, format!("invalid app secret: {}", e)))?;
            mac.update(unsigned.as_bytes());
            format!("{:X}", mac.finalize().into_bytes())
        }
        SignMethod::Sha256Wrapped => {
            let mut hasher = Sha256::new();
            hasher.update(secret.as_bytes());
            hasher.update(unsigned.as_bytes());
            hasher.update(secret.as_bytes());
            format!("{:X}", hasher.finalize())
        }
    };

    Ok(signature)
}

#[async_trait]
impl CatalogProvider for AliExpress {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_products(
        &self,
        ctx: &RequestContext,
        keywords: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Product>> {
        let mut params = self.build_params(keywords, filters);
        let signature = sign(&params, &self.app_secret, self.sign_method)?;
        params.insert("sign".to_string(), signature);

        let mut request = ApiRequest::get(self.base_url.as_str()).timeout(self.timeout);
        for (key, value) in params {
            request = request.param(key, value);
        }

        debug!(
            request_id = ctx.request_id(),
            "AliExpress query: keywords={:?}", keywords
        );
        let response = self.client.execute(request).await?;
        debug!(
            request_id = ctx.request_id(),
            "AliExpress response status={} body={}",
            response.status,
            response.preview(800)
        );

        if response.is_redirect() {
            let location = response.header("location").unwrap_or_default();
            warn!("AliExpress redirected to {}", location);
            return Err(Error::upstream(
                PROVIDER,
                format!("redirected: status={} location={}", response.status, location),
            ));
        }

        if response.status != 200 {
            return Err(Error::upstream(
                PROVIDER,
                format!("status {}: {}", response.status, response.preview(1000)),
            ));
        }

        map_products(&response.text)
    }
}

/// Map a raw API body to products
pub fn map_products(body: &str) -> Result<Vec<Product>> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| Error::parse("aliexpress response", format!("{}: {}", e, preview(body, 200))))?;

    let items = root
        .pointer(SG_PRODUCTS)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .or_else(|| root.pointer(LEGACY_PRODUCTS).and_then(Value::as_array));

    let Some(items) = items else {
        debug!("AliExpress response carries no products");
        return Ok(Vec::new());
    };

    let fx_timestamp = Utc::now();
    Ok(items.iter().map(|item| map_product(item, fx_timestamp)).collect())
}

fn map_product(item: &Value, fx_timestamp: chrono::DateTime<Utc>) -> Product {
    let text = |key: &str| field_text(item, key);

    let mut usd = parse_lenient(&text("sale_price"));
    if usd == 0.0 {
        usd = parse_lenient(&text("app_sale_price"));
    }

    // evaluate_rate is a positive feedback percentage, ratings are out of 5
    let rating = (parse_lenient(&text("evaluate_rate")) / 20.0).clamp(0.0, 5.0);

    Product {
        id: text("product_id"),
        title: text("product_title"),
        image_url: text("product_main_image_url"),
        price: Price {
            etb: 0.0,
            usd,
            fx_timestamp,
        },
        product_rating: rating,
        seller_name: text("shop_name"),
        delivery_estimate: text("ship_to_days"),
        number_sold: parse_lenient(&text("lastest_volume")) as u64,
        deeplink_url: text("product_detail_url"),
        tax_rate: parse_lenient(&text("tax_rate")),
        discount: parse_lenient(&text("discount")),
        ..Default::default()
    }
}

/// Trimmed string form of a field that may be a string or a number
fn field_text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse "1,234.5" or "92.1%"; anything unparsable is zero
fn parse_lenient(raw: &str) -> f64 {
    let cleaned = raw.trim().trim_end_matches('%').replace(',', "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: String) -> CatalogSettings {
        CatalogSettings {
            base_url,
            app_key: "12345".to_string(),
            app_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    fn gateway(server: &MockServer) -> AliExpress {
        AliExpress::new(
            HttpClient::new().unwrap(),
            &settings(format!("{}/sync", server.uri())),
        )
        .unwrap()
    }

    fn sg_body() -> Value {
        json!({
            "aliexpress_affiliate_product_query_response": {
                "resp_result": {
                    "result": {
                        "products": {
                            "product": [{
                                "product_id": 1005001,
                                "product_title": " Smart Watch ",
                                "sale_price": "",
                                "app_sale_price": "1,299.50",
                                "evaluate_rate": "92.0%",
                                "discount": "50%",
                                "tax_rate": "0.1",
                                "ship_to_days": "7",
                                "lastest_volume": "2300",
                                "product_detail_url": "https://aliexpress.com/item/1005001.html"
                            }]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_invalid_base_url() {
        let result = AliExpress::new(HttpClient::new().unwrap(), &settings("not a url".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_sign_is_uppercase_hex_and_skips_empty_values() {
        let mut params = BTreeMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());

        let mut with_empty = params.clone();
        with_empty.insert("c".to_string(), String::new());

        for method in [SignMethod::HmacSha256, SignMethod::Sha256Wrapped] {
            let signature = sign(&params, "secret", method).unwrap();
            assert_eq!(signature.len(), 64);
            assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            assert_eq!(sign(&with_empty, "secret", method).unwrap(), signature);
        }

        assert_ne!(
            sign(&params, "secret", SignMethod::HmacSha256).unwrap(),
            sign(&params, "secret", SignMethod::Sha256Wrapped).unwrap()
        );
    }

    #[test]
    fn test_sha256_wrapped_known_value() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "1".to_string());
        // sha256("sa1s")
        let expected = format!("{:X}", Sha256::digest(b"sa1s"));
        assert_eq!(sign(&params, "s", SignMethod::Sha256Wrapped).unwrap(), expected);
    }

    #[test]
    fn test_build_params_maps_filters() {
        let server_less = AliExpress::new(
            HttpClient::new().unwrap(),
            &settings("https://api-sg.aliexpress.com/sync".to_string()),
        )
        .unwrap();

        let filters = SearchFilters {
            category: Some("44".to_string()),
            max_price: Some(85.0),
            delivery_days_max: Some(5),
            sort: Some(" ".to_string()),
            ..Default::default()
        };
        let params = server_less.build_params("phone", &filters);

        assert_eq!(params["method"], METHOD);
        assert_eq!(params["page_no"], "1");
        assert_eq!(params["page_size"], "20");
        assert_eq!(params["category_ids"], "44");
        assert_eq!(params["max_sale_price"], "85");
        assert_eq!(params["delivery_days"], "5");
        assert!(!params.contains_key("min_sale_price"));
        assert!(!params.contains_key("sort"));
    }

    #[test]
    fn test_map_sg_envelope() {
        let products = map_products(&sg_body().to_string()).unwrap();
        assert_eq!(products.len(), 1);

        let p = &products[0];
        assert_eq!(p.id, "1005001");
        assert_eq!(p.title, "Smart Watch");
        assert_eq!(p.price.usd, 1299.5);
        assert_eq!(p.discount, 50.0);
        assert!((p.product_rating - 4.6).abs() < 1e-9);
        assert_eq!(p.number_sold, 2300);
    }

    #[test]
    fn test_map_legacy_envelope() {
        let body = json!({
            "resp_result": {"result": {"products": [
                {"product_id": "33006951782", "sale_price": "15.9", "discount": "bogus"}
            ]}}
        });
        let products = map_products(&body.to_string()).unwrap();
        assert_eq!(products[0].id, "33006951782");
        assert_eq!(products[0].price.usd, 15.9);
        assert_eq!(products[0].discount, 0.0);
    }

    #[test]
    fn test_map_no_products_and_bad_json() {
        assert!(map_products(r#"{"resp_result":{}}"#).unwrap().is_empty());
        assert!(matches!(map_products("<html>"), Err(Error::Parse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_products_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sync"))
            .and(query_param("method", METHOD))
            .and(query_param("app_key", "12345"))
            .and(query_param("keywords", "smart watch"))
            .and(query_param("sign_method", "sha256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sg_body()))
            .expect(1)
            .mount(&server)
            .await;

        let products = gateway(&server)
            .fetch_products(&RequestContext::default(), "smart watch", &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(products.len(), 1);

        let requests = server.received_requests().await.unwrap();
        let has_sign = requests[0].url.query_pairs().any(|(k, v)| k == "sign" && v.len() == 64);
        assert!(has_sign);
    }

    #[tokio::test]
    async fn test_redirect_names_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "https://maintenance.example"),
            )
            .mount(&server)
            .await;

        let err = gateway(&server)
            .fetch_products(&RequestContext::default(), "x", &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https://maintenance.example"));
    }

    #[tokio::test]
    async fn test_non_200_is_error_with_preview() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .fetch_products(&RequestContext::default(), "x", &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
