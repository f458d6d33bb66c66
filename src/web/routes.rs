//! Route definitions

use super::handlers;
use super::middleware::rate_limit;
use super::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes counted against the device's request budget
    let limited = Router::new()
        .route("/search", get(handlers::search))
        .route("/compare", post(handlers::compare))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .merge(limited);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::Settings;
    use crate::context::RequestContext;
    use crate::domain::{Comparison, Product, SearchFilters};
    use crate::error::{Error, Result};
    use crate::gateways::{CatalogProvider, ComparisonProvider, MockCatalog, MockLlm};
    use crate::limiter::RateLimiter;
    use crate::metrics::Metrics;
    use crate::network::HttpClient;
    use crate::search::{CompareProducts, SearchOrchestrator};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct DownCatalog;

    #[async_trait]
    impl CatalogProvider for DownCatalog {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch_products(
            &self,
            _ctx: &RequestContext,
            _keywords: &str,
            _filters: &SearchFilters,
        ) -> Result<Vec<Product>> {
            Err(Error::upstream("down", "unreachable"))
        }
    }

    #[derive(Default)]
    struct CountingCompare {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ComparisonProvider for CountingCompare {
        fn name(&self) -> &str {
            "counting"
        }

        async fn compare(&self, ctx: &RequestContext, products: &[Product]) -> Result<Comparison> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MockLlm::new().compare(ctx, products).await
        }
    }

    fn state_with(
        catalog: Arc<dyn CatalogProvider>,
        comparison: Arc<dyn ComparisonProvider>,
        limit: u64,
    ) -> AppState {
        let metrics = Arc::new(Metrics::new());
        let llm = Arc::new(MockLlm::new());
        let search = SearchOrchestrator::new(llm.clone(), catalog)
            .with_enhancer(llm)
            .with_metrics(metrics.clone());
        let compare = CompareProducts::new(comparison, metrics);
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), limit, Duration::from_secs(60));

        AppState::new(Settings::default(), search, compare, Some(limiter))
    }

    fn app(limit: u64) -> Router {
        create_router(state_with(
            Arc::new(MockCatalog::new()),
            Arc::new(MockLlm::new()),
            limit,
        ))
    }

    fn get_req(uri: &str, device: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(device) = device {
            builder = builder.header("X-Device-ID", device);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn compare_req(body: &str, lang: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/compare")
            .header("X-Device-ID", "d1")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(lang) = lang {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn two_products() -> Value {
        json!({"products": [
            {"id": "a", "price": {"usd": 20.0}},
            {"id": "b", "price": {"usd": 10.0}}
        ]})
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(5).oneshot(get_req("/api/v1/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "ok");
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_search_requires_device_id() {
        let response = app(5)
            .oneshot(get_req("/api/v1/search?q=phone", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        for uri in ["/api/v1/search", "/api/v1/search?q=%20%20"] {
            let response = app(5).oneshot(get_req(uri, Some("d1"))).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_search_returns_products() {
        let response = app(5)
            .oneshot(get_req("/api/v1/search?q=budget%20phone", Some("d1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let products = body["data"]["products"].as_array().unwrap();
        assert_eq!(products.len(), 5);
        assert!(products[0]["price"]["etb"].is_number());
    }

    #[tokio::test]
    async fn test_rate_limit_throttles_after_limit() {
        let router = app(2);
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(get_req("/api/v1/search?q=phone", Some("d1")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(get_req("/api/v1/search?q=phone", Some("d1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(json_body(response).await["error"]["code"], "RATE_LIMITED");

        // another device has its own budget
        let response = router
            .oneshot(get_req("/api/v1/search?q=phone", Some("d2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_bad_gateway() {
        let router = create_router(state_with(
            Arc::new(DownCatalog),
            Arc::new(MockLlm::new()),
            5,
        ));
        let response = router
            .oneshot(get_req("/api/v1/search?q=phone", Some("d1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_compare_malformed_json_never_reaches_provider() {
        let provider = Arc::new(CountingCompare::default());
        let router = create_router(state_with(Arc::new(MockCatalog::new()), provider.clone(), 5));

        let response = router
            .oneshot(compare_req("{\"products\": [", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_product_count() {
        let provider = Arc::new(CountingCompare::default());
        let router = create_router(state_with(Arc::new(MockCatalog::new()), provider.clone(), 5));

        let one = json!({"products": [{"id": "a"}]}).to_string();
        let response = router.oneshot(compare_req(&one, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_in_amharic() {
        let response = app(5)
            .oneshot(compare_req(&two_products().to_string(), Some("am-ET")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let entries = body["data"]["comparison"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["synthesis"]["isBestValue"], true);
        assert_eq!(entries[0]["synthesis"]["pros"][0], "መልካም ዋጋ");
    }

    #[tokio::test]
    async fn test_stats_counts_searches() {
        let router = app(5);
        router
            .clone()
            .oneshot(get_req("/api/v1/search?q=phone", Some("d1")))
            .await
            .unwrap();

        let response = router.oneshot(get_req("/api/v1/stats", None)).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["data"]["searches"], 1);
        assert_eq!(body["data"]["providers"]["mock"]["calls"], 1);
    }

    #[test]
    fn test_from_settings_wires_mock_providers() {
        let state = AppState::from_settings(
            Settings::default(),
            HttpClient::new().unwrap(),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        assert!(state.limiter.is_some());
        assert!(state.rates.is_none());
    }
}
