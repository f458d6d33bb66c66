//! JSON envelope and error mapping for API responses

use crate::error::Error;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use tracing::error;

/// Error part of the envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// `{"data": ..., "error": ...}`, exactly one of them non-null
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

/// Successful response wrapped in the envelope
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        data: Some(data),
        error: None,
    })
}

/// Error response with status, envelope and optional `Retry-After`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retry_after: Option<Duration>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "rate limit exceeded",
            )
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) | Error::Rejected(msg) => Self::invalid_input(msg),
            Error::Cancelled(reason) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", reason)
            }
            Error::Upstream { .. } | Error::Parse { .. } | Error::Http(_) | Error::Json(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
            }
            Error::Store(_) | Error::Fx(_) => {
                error!("Internal failure: {}", err);
                Self::internal("internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(Envelope::<()> {
            data: None,
            error: Some(ErrorBody {
                code: self.code,
                message: self.message,
            }),
        });

        let mut response = (self.status, body).into_response();
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
