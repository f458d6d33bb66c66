//! HTTP request handlers

use super::response::{ok, ApiError, Envelope};
use super::state::AppState;
use crate::context::{CancelGuard, Language, RequestContext};
use crate::domain::Comparison;
use crate::metrics::MetricsSnapshot;
use crate::search::{CompareRequest, SearchResults};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub time: String,
}

/// Context for one request: language from `Accept-Language`, the
/// configured deadline, and cancellation when the handler is dropped
fn request_context(state: &AppState, headers: &HeaderMap) -> (RequestContext, CancelGuard) {
    let language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(Language::from_header)
        .unwrap_or(state.settings.search.default_language);

    let (ctx, cancel) = RequestContext::new(language)
        .with_timeout(state.settings.search.request_timeout())
        .with_cancellation();
    (ctx, cancel.drop_guard())
}

/// Health check handler
pub async fn health() -> Json<Envelope<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Search handler
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<SearchResults>>, ApiError> {
    let query = match params.q {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(ApiError::invalid_input("query parameter 'q' is required")),
    };

    let (ctx, _cancel) = request_context(&state, &headers);
    let results = state.search.execute(&ctx, &query).await?;
    Ok(ok(results))
}

/// Comparison handler
pub async fn compare(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<Envelope<Comparison>>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;

    let (ctx, _cancel) = request_context(&state, &headers);
    let comparison = state.compare.execute(&ctx, &request.products).await?;
    Ok(ok(comparison))
}

/// Stats handler
pub async fn stats(State(state): State<AppState>) -> Json<Envelope<MetricsSnapshot>> {
    ok(state.metrics.snapshot())
}
