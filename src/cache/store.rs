//! Key/value store with per-key expiry and atomic counters

use crate::error::{Error, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;
use std::time::Duration;
use tokio::time::Instant;

/// Store shared process-wide by the rate limiter and the FX cache
///
/// A missing key is never an error: `get` returns `Ok(None)` and callers
/// treat that as "fetch from the source".
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value; `None` keeps it until deleted
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Atomically add one to an integer value, creating it at 1.
    /// An existing expiry is preserved; a new key has none.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set the expiry of an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remove a key. Returns false when the key was absent.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Value held by [`MemoryStore`]
///
/// The deadline is kept on the tokio clock and checked on every access;
/// moka evicts the entry around the same time on its own clock.
#[derive(Debug, Clone)]
struct Stored {
    value: String,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Per-entry expiry taken from the stored deadline
struct StoredExpiry;

impl Expiry<String, Stored> for StoredExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        value.remaining()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.remaining()
    }
}

/// In-process store for development and tests
///
/// Bounded by entry count. Counters are only shared within this process,
/// so deployments with more than one replica use [`RedisStore`](super::RedisStore).
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Stored>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(StoredExpiry)
            .build();

        Self { entries }
    }

    /// Number of stored entries after pending evictions are applied
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .await
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), Stored { value, expires_at })
            .await;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| {
                let live = current
                    .map(|entry| entry.into_value())
                    .filter(|stored| stored.is_live(now));
                let op = match live {
                    None => Op::Put(Stored {
                        value: "1".to_string(),
                        expires_at: None,
                    }),
                    Some(stored) => match stored
                        .value
                        .parse::<i64>()
                        .ok()
                        .and_then(|n| n.checked_add(1))
                    {
                        Some(next) => Op::Put(Stored {
                            value: next.to_string(),
                            expires_at: stored.expires_at,
                        }),
                        None => Op::Nop,
                    },
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => entry
                .into_value()
                .value
                .parse()
                .map_err(|_| Error::Store(format!("value at {} is not an integer", key))),
            _ => Err(Error::Store(format!(
                "value at {} is not an integer or overflowed",
                key
            ))),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current
                    .map(|entry| entry.into_value())
                    .filter(|stored| stored.is_live(now))
                {
                    Some(stored) => Op::Put(Stored {
                        expires_at: Some(now + ttl),
                        ..stored
                    }),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .await
            .map_or(false, |stored| stored.is_live(now)))
    }
}
