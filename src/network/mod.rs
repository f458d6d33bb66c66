//! HTTP networking module
//!
//! Provides the HTTP client the gateways use to reach upstream APIs.

mod client;

pub use client::{preview, ApiRequest, ApiResponse, HttpClient, HttpMethod};
