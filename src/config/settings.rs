//! Settings structures for ShopAlly-RS configuration

use crate::context::Language;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main settings structure matching settings.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub fx: FxSettings,
    pub llm: LlmSettings,
    pub catalog: CatalogSettings,
    pub outgoing: OutgoingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary variable source
    pub fn merge_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("SHOPALLY_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("SHOPALLY_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = var("SHOPALLY_RATE_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.rate_limit.limit = limit;
            }
        }
        if let Some(val) = var("SHOPALLY_RATE_WINDOW_SECS") {
            if let Ok(window) = val.parse() {
                self.rate_limit.window_secs = window;
            }
        }
        if let Some(val) = var("SHOPALLY_CACHE_BACKEND") {
            match val.to_ascii_lowercase().as_str() {
                "redis" => self.cache.backend = CacheBackend::Redis,
                "memory" => self.cache.backend = CacheBackend::Memory,
                _ => {}
            }
        }
        if let Some(val) = var("REDIS_URL") {
            self.cache.redis_url = val;
        }
        if let Some(val) = var("SHOPALLY_LLM_PROVIDER") {
            match val.to_ascii_lowercase().as_str() {
                "gemini" => self.llm.provider = LlmBackend::Gemini,
                "mock" => self.llm.provider = LlmBackend::Mock,
                _ => {}
            }
        }
        if let Some(val) = var("GEMINI_API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Some(val) = var("SHOPALLY_CATALOG_PROVIDER") {
            match val.to_ascii_lowercase().as_str() {
                "aliexpress" => self.catalog.provider = CatalogBackend::Aliexpress,
                "mock" => self.catalog.provider = CatalogBackend::Mock,
                _ => {}
            }
        }
        if let Some(val) = var("ALIEXPRESS_APP_KEY") {
            self.catalog.app_key = val;
        }
        if let Some(val) = var("ALIEXPRESS_APP_SECRET") {
            self.catalog.app_secret = val;
        }
        if let Some(val) = var("FX_API_URL") {
            self.fx.api_url = val;
        }
        if let Some(val) = var("FX_API_KEY") {
            self.fx.api_key = Some(val);
        }
    }

    /// Check cross-field constraints before wiring the service
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be greater than zero");
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.trim().is_empty() {
            anyhow::bail!("cache.redis_url (or REDIS_URL) is required for the redis backend");
        }
        if self.cache.backend == CacheBackend::Memory && self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than zero");
        }
        if self.llm.provider == LlmBackend::Gemini
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("llm.api_key (or GEMINI_API_KEY) is required for the gemini provider");
        }
        if self.catalog.provider == CatalogBackend::Aliexpress
            && (self.catalog.app_key.is_empty() || self.catalog.app_secret.is_empty())
        {
            anyhow::bail!("catalog.app_key and catalog.app_secret are required for aliexpress");
        }
        Ok(())
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Search pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Deadline for a whole search request in seconds
    pub request_timeout: f64,
    /// Language used when the client sends no Accept-Language
    pub default_language: Language,
    /// Run the enrichment stage
    pub enrich_results: bool,
    /// Fill ETB prices from the USD price
    pub localize_prices: bool,
}

impl SearchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            request_timeout: 30.0,
            default_language: Language::En,
            enrich_results: true,
            localize_prices: true,
        }
    }
}

/// Fixed-window rate limiter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Enable the limiter on rate-limited routes
    pub enabled: bool,
    /// Requests admitted per window and device
    pub limit: u64,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 30,
            window_secs: 60,
        }
    }
}

/// Where rate counters and cached rates live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process, for development and tests
    #[default]
    Memory,
    /// Shared Redis server
    Redis,
}

/// Cache store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Connection URL for the redis backend
    pub redis_url: String,
    /// Capacity of the in-process backend
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            max_entries: 10_000,
        }
    }
}

/// Exchange rate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FxSettings {
    /// Conversion endpoint
    pub api_url: String,
    /// Access key, if the provider needs one
    pub api_key: Option<String>,
    /// How long a fetched rate is served from cache
    pub cache_ttl_secs: u64,
    /// Background refresh interval for USD->ETB, 0 disables it
    pub warm_interval_secs: u64,
}

impl FxSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for FxSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.exchangerate.host/convert".to_string(),
            api_key: None,
            cache_ttl_secs: 12 * 60 * 60,
            warm_interval_secs: 30 * 60,
        }
    }
}

/// Which language model backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    #[default]
    Mock,
    Gemini,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmBackend,
    pub api_key: Option<String>,
    /// generateContent endpoint of the model
    pub model_url: String,
    /// Per-call timeout in seconds
    pub timeout: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmBackend::Mock,
            api_key: None,
            model_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
            timeout: 12.0,
        }
    }
}

/// Which product catalog backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    #[default]
    Mock,
    Aliexpress,
}

/// Request signing strategy for the catalog API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignMethod {
    /// HMAC-SHA256 keyed with the app secret
    #[default]
    HmacSha256,
    /// SHA-256 over secret + params + secret
    Sha256Wrapped,
}

/// Product catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub provider: CatalogBackend,
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub sign_method: SignMethod,
    /// Default page size when the intent carries none
    pub page_size: u32,
    /// Per-call timeout in seconds
    pub timeout: f64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            provider: CatalogBackend::Mock,
            base_url: "https://api-sg.aliexpress.com/sync".to_string(),
            app_key: String::new(),
            app_secret: String::new(),
            sign_method: SignMethod::default(),
            page_size: 20,
            timeout: 10.0,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Proxy for all outgoing requests
    pub proxy: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 15.0,
            pool_maxsize: 20,
            proxy: None,
            user_agent: None,
        }
    }
}
