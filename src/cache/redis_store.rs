//! Redis-backed store shared by every replica

use super::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

/// [`CacheStore`] over a Redis server
///
/// `incr` maps to INCR, so counters are atomic across processes. The
/// connection manager reconnects on its own after a dropped connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to redis at {}", redact(url));
        Ok(Self { conn })
    }
}

/// Whole seconds for EX/EXPIRE, rounded up and never zero
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Drop credentials from a connection URL before logging it
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid url>".to_string(),
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let applied: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}
