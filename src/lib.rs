//! ShopAlly-RS: shopping assistant search backend
//!
//! A free-text query (English or Amharic) is parsed into structured
//! filters by a language model, matched against a product catalog, ranked,
//! localized to birr and enriched with generated copy. A fixed-window
//! limiter and a TTL cache protect the upstreams.

pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod fx;
pub mod gateways;
pub mod limiter;
pub mod metrics;
pub mod network;
pub mod search;
pub mod web;

pub use config::Settings;
pub use context::{Language, RequestContext};
pub use error::{Error, Result};
pub use search::{SearchOrchestrator, SearchResults};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
