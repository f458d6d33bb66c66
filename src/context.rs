//! Per-request context: id, response language, deadline and cancellation
//!
//! A `RequestContext` is cheap to clone and is handed to every provider call
//! and every spawned enrichment task, so a deadline or a cancel reaches all
//! of them at once.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Language used for generated content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Am,
}

impl Language {
    /// Parse an `Accept-Language` style value; only the primary tag matters
    pub fn from_header(value: &str) -> Self {
        let primary = value
            .split(|c: char| c == ',' || c == ';' || c == '-')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match primary.as_str() {
            "am" => Language::Am,
            _ => Language::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Am => "am",
        }
    }
}

/// Handle used by the owner of a request to cancel it
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Guard that cancels when dropped, e.g. when a handler future is
    /// dropped on client disconnect
    pub fn drop_guard(self) -> CancelGuard {
        CancelGuard(self)
    }
}

#[derive(Debug)]
pub struct CancelGuard(CancelHandle);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Context carried through the pipeline for a single request
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    language: Language,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    /// Create a context with no deadline and no cancellation
    pub fn new(language: Language) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            language,
            deadline: None,
            cancel: None,
        }
    }

    /// Set a deadline relative to now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Attach a cancellation signal and return the handle that triggers it
    pub fn with_cancellation(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx: Arc::new(tx) })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once the deadline passed or cancel was requested
    pub fn is_done(&self) -> bool {
        let expired = self.deadline.map_or(false, |d| Instant::now() >= d);
        let cancelled = self.cancel.as_ref().map_or(false, |rx| *rx.borrow());
        expired || cancelled
    }

    /// Run `fut` until it completes or the context is done
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        if self.is_done() {
            return Err(Error::Cancelled("context already done"));
        }

        tokio::select! {
            out = fut => Ok(out),
            reason = self.done() => Err(Error::Cancelled(reason)),
        }
    }

    /// Resolves when the deadline elapses or cancel is requested
    async fn done(&self) -> &'static str {
        let deadline = async {
            match self.deadline {
                Some(d) => sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => loop {
                    if *rx.borrow_and_update() {
                        break;
                    }
                    // Sender gone: nobody can cancel any more
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = deadline => "deadline exceeded",
            _ = cancelled => "cancelled by caller",
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
