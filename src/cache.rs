//! Short-lived smoothing of per-target latency and availability.
//!
//! Each [`MetricCache::merge`] blends a freshly reported measurement with the
//! last value recorded for the same target id, when that value is no older
//! than the ttl, and records the result. Entries are keyed by target id
//! alone, so every caller naming the same id shares one smoothed series.
//!
//! Entries are never evicted by `merge`. Long-running processes that see a
//! churning set of target ids can bound the map with [`MetricCache::sweep`] or
//! [`spawn_sweeper`].

use crate::clock::Clock;
use crate::error::ConfigError;
use crate::target::Target;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Smoothed signal last recorded for one target id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricEntry {
    pub latency_ms: i64,
    pub availability: f64,
    /// Reading of the merge that wrote this entry.
    pub updated_at: u64,
}

/// Per-target smoothing cache with a time-to-live.
#[derive(Debug)]
pub struct MetricCache {
    ttl: Duration,
    metrics: Mutex<HashMap<String, MetricEntry>>,
}

impl MetricCache {
    /// # Errors
    /// Returns [`ConfigError::InvalidTtl`] if `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self, ConfigError> {
        if ttl.is_zero() {
            return Err(ConfigError::InvalidTtl(ttl));
        }
        Ok(Self { ttl, metrics: Mutex::new(HashMap::new()) })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Blend `targets` with their cached history and record the results.
    ///
    /// Output order and length match the input. A cached entry aged at most
    /// `ttl` is averaged in (latency by truncating integer mean); a missing or
    /// stale entry leaves the target as reported. Every supplied id is then
    /// written back with `updated_at = now_millis`.
    pub fn merge(&self, targets: &[Target], now_millis: u64) -> Vec<Target> {
        let ttl_millis = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        let mut metrics = self.lock();

        targets
            .iter()
            .map(|target| {
                let mut merged = target.clone();
                if let Some(cached) = metrics.get(&target.id) {
                    if now_millis.saturating_sub(cached.updated_at) <= ttl_millis {
                        merged.latency_ms = mean_latency(merged.latency_ms, cached.latency_ms);
                        merged.availability = (merged.availability + cached.availability) / 2.0;
                    }
                }
                metrics.insert(
                    merged.id.clone(),
                    MetricEntry {
                        latency_ms: merged.latency_ms,
                        availability: merged.availability,
                        updated_at: now_millis,
                    },
                );
                merged
            })
            .collect()
    }

    /// Cached entry for `id`, fresh or not.
    pub fn entry(&self, id: &str) -> Option<MetricEntry> {
        self.lock().get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove entries older than `max_age` at `now_millis`; returns how many went.
    pub fn sweep(&self, now_millis: u64, max_age: Duration) -> usize {
        let max_age_millis = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let mut metrics = self.lock();
        let before = metrics.len();
        metrics.retain(|_, entry| now_millis.saturating_sub(entry.updated_at) <= max_age_millis);
        before - metrics.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MetricEntry>> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Truncating mean of two non-negative latencies, without overflowing on the sum.
fn mean_latency(a: i64, b: i64) -> i64 {
    a / 2 + b / 2 + (a % 2 + b % 2) / 2
}

/// Shortest period [`spawn_sweeper`] will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically sweep `cache`, dropping entries older than `ttl * ttl_multiple`.
///
/// An `every` shorter than [`MIN_SWEEP_INTERVAL`] (including zero) is raised to it.
/// Must be called inside a tokio runtime. Abort the returned handle to stop.
pub fn spawn_sweeper(
    cache: Arc<MetricCache>,
    clock: Arc<dyn Clock>,
    every: Duration,
    ttl_multiple: u32,
) -> JoinHandle<()> {
    let max_age = cache.ttl().saturating_mul(ttl_multiple.max(1));
    let every = every.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = cache.sweep(clock.now_millis(), max_age);
            if removed > 0 {
                tracing::debug!(removed, remaining = cache.len(), "metric cache swept");
            }
        }
    })
}
