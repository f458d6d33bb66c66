//! Error types shared by the search pipeline and its gateways

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pipeline, the cache store and the upstream gateways
#[derive(Debug, Error)]
pub enum Error {
    /// Client supplied something unusable (missing query, bad body, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An upstream provider answered with a failure
    #[error("{provider} request failed: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },

    /// An upstream answer could not be interpreted
    #[error("failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    /// Cache store unavailable or holding an unexpected value
    #[error("cache store error: {0}")]
    Store(String),

    /// No usable exchange rate
    #[error("exchange rate unavailable: {0}")]
    Fx(String),

    /// Deadline elapsed or the caller cancelled the request
    #[error("request cancelled: {0}")]
    Cancelled(&'static str),

    /// Query refused by content moderation
    #[error("query rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

impl Error {
    pub fn upstream(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            message: message.into(),
        }
    }

    pub fn parse(what: &'static str, message: impl ToString) -> Self {
        Self::Parse {
            what,
            message: message.to_string(),
        }
    }

    /// Whether the error came from the deadline or an explicit cancel
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
