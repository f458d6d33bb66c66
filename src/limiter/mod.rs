//! Fixed-window request limiter keyed by device
//!
//! The counter lives in the shared [`CacheStore`]; the limiter itself keeps
//! no state. Each request increments `rate:<device>`. The increment that
//! produces 1 sets the key's expiry to the window length, so the window is
//! fixed from the first request and bursts at window boundaries are
//! possible. Two concurrent first requests may both set the same expiry,
//! which is harmless.

use crate::cache::{rate_key, CacheStore};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admitted { count: i64 },
    Throttled { count: i64, retry_after: Duration },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `device_id` and decide whether to admit it
    ///
    /// A missing or blank device id is rejected before the counter is
    /// touched. Store failures propagate: without the counter the request
    /// cannot be admitted safely.
    pub async fn check(&self, device_id: Option<&str>) -> Result<RateDecision> {
        let device_id = match device_id.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => return Err(Error::InvalidInput("missing device id".to_string())),
        };

        let key = rate_key(device_id);
        let count = self.store.incr(&key).await?;

        if count == 1 {
            if let Err(e) = self.store.expire(&key, self.window).await {
                warn!("Failed to set expiry for {}: {}", key, e);
            }
        }

        debug!(
            "Rate limit count for {}: {} (limit {})",
            device_id, count, self.limit
        );

        if count > self.limit as i64 {
            Ok(RateDecision::Throttled {
                count,
                retry_after: self.window,
            })
        } else {
            Ok(RateDecision::Admitted { count })
        }
    }
}
