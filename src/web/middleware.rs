//! Per-device rate limiting for API routes

use super::response::ApiError;
use super::state::AppState;
use crate::error::Error;
use crate::limiter::RateDecision;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

pub const DEVICE_ID_HEADER: &str = "X-Device-ID";

/// Admit, throttle or reject a request based on its device id
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(limiter) = state.limiter.as_ref() else {
        return next.run(request).await;
    };

    let device_id = request
        .headers()
        .get(DEVICE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match limiter.check(device_id.as_deref()).await {
        Ok(RateDecision::Admitted { .. }) => next.run(request).await,
        Ok(RateDecision::Throttled { count, retry_after }) => {
            info!(
                device_id = device_id.as_deref().unwrap_or_default(),
                count, "Throttled request"
            );
            state.metrics.inc_throttled();
            ApiError::rate_limited(retry_after).into_response()
        }
        Err(Error::InvalidInput(_)) => {
            ApiError::invalid_input(format!("{} header is required", DEVICE_ID_HEADER))
                .into_response()
        }
        Err(e) => {
            error!("Rate limiter unavailable: {}", e);
            ApiError::internal("rate limiter unavailable").into_response()
        }
    }
}
