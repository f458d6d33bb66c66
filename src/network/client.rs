//! HTTP client used by the upstream gateways

use crate::config::OutgoingSettings;
use crate::error::Result;
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request to an upstream API
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters, in insertion order
    pub params: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Per-request timeout overriding the client default
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Get)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Post)
    }

    fn with_method(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response from an upstream API
#[derive(Debug)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, lowercase names
    pub headers: HashMap<String, String>,
    /// Response body as text
    pub text: String,
    /// Final URL
    pub url: String,
}

impl ApiResponse {
    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response is a redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// First `max` characters of the body, for logs and error messages
    pub fn preview(&self, max: usize) -> String {
        preview(&self.text, max)
    }
}

/// Truncate `text` to `max` characters, marking the cut
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// HTTP client wrapper shared by all gateways
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    ///
    /// Redirects are not followed: upstream APIs answering with a redirect
    /// are usually serving a maintenance page, and gateways report that.
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs_f64(settings.request_timeout))
            .pool_max_idle_per_host(settings.pool_maxsize)
            .redirect(reqwest::redirect::Policy::none())
            .gzip(true)
            .brotli(true);

        if let Some(ref proxy_url) = settings.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        let client = builder.build()?;

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("shopally-rs/{}", crate::VERSION));

        Ok(Self {
            client,
            default_timeout: Duration::from_secs_f64(settings.request_timeout),
            user_agent,
        })
    }

    /// Execute a request
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder
            .timeout(timeout)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json");

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        if let Some(ref body) = request.body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await?;

        Self::parse_response(response).await
    }

    /// POST with JSON body
    pub async fn post_json(&self, url: &str, json: serde_json::Value) -> Result<ApiResponse> {
        self.execute(ApiRequest::post(url).json(json)).await
    }

    async fn parse_response(response: Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let text = response.text().await?;

        Ok(ApiResponse {
            status,
            headers,
            text,
            url,
        })
    }
}
