//! Metrics collection module
//!
//! Tracks pipeline counters and upstream provider performance.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Response times kept per provider
const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct ProviderCounters {
    successes: u64,
    errors: u64,
    /// Most recent response times in ms
    response_times: Vec<u64>,
}

/// Metrics collector owned by the application state
#[derive(Debug, Default)]
pub struct Metrics {
    searches: AtomicU64,
    intent_fallbacks: AtomicU64,
    catalog_failures: AtomicU64,
    enrichment_failures: AtomicU64,
    throttled_requests: AtomicU64,
    comparisons: AtomicU64,
    providers: RwLock<HashMap<String, ProviderCounters>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Intent parsing failed and the search ran with empty filters
    pub fn inc_intent_fallback(&self) {
        self.intent_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_catalog_failure(&self) {
        self.catalog_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_enrichment_failures(&self, count: u64) {
        self.enrichment_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_throttled(&self) {
        self.throttled_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_comparison(&self) {
        self.comparisons.fetch_add(1, Ordering::Relaxed);
    }

    fn write_providers(&self) -> RwLockWriteGuard<'_, HashMap<String, ProviderCounters>> {
        self.providers.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_providers(&self) -> RwLockReadGuard<'_, HashMap<String, ProviderCounters>> {
        self.providers.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one upstream call
    pub fn record_provider_call(&self, provider: &str, time_ms: u64, ok: bool) {
        let mut providers = self.write_providers();
        let entry = providers.entry(provider.to_string()).or_default();

        if ok {
            entry.successes += 1;
        } else {
            entry.errors += 1;
        }

        if entry.response_times.len() >= RESPONSE_WINDOW {
            entry.response_times.remove(0);
        }
        entry.response_times.push(time_ms);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self
            .read_providers()
            .iter()
            .map(|(name, c)| {
                let total = c.successes + c.errors;
                let stats = ProviderStats {
                    calls: total,
                    avg_response_time: (!c.response_times.is_empty()).then(|| {
                        c.response_times.iter().sum::<u64>() / c.response_times.len() as u64
                    }),
                    reliability: if total == 0 {
                        100.0
                    } else {
                        c.successes as f64 / total as f64 * 100.0
                    },
                };
                (name.clone(), stats)
            })
            .collect();

        MetricsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            intent_fallbacks: self.intent_fallbacks.load(Ordering::Relaxed),
            catalog_failures: self.catalog_failures.load(Ordering::Relaxed),
            enrichment_failures: self.enrichment_failures.load(Ordering::Relaxed),
            throttled_requests: self.throttled_requests.load(Ordering::Relaxed),
            comparisons: self.comparisons.load(Ordering::Relaxed),
            providers,
        }
    }
}

/// Statistics for a single upstream provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    pub calls: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}

/// Serializable view served on the stats route
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub intent_fallbacks: u64,
    pub catalog_failures: u64,
    pub enrichment_failures: u64,
    pub throttled_requests: u64,
    pub comparisons: u64,
    pub providers: HashMap<String, ProviderStats>,
}
