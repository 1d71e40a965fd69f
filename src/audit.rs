//! Audit trail of routing decisions.
//!
//! The router hands every decision to an [`AuditSink`]. [`MemoryAuditStore`]
//! keeps the most recent entries for inspection; [`TracingAuditSink`] logs them.

use crate::error::AuditError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Entries retained by [`MemoryAuditStore::default`].
pub const DEFAULT_AUDIT_CAPACITY: usize = 1_000;
/// Entries returned by [`MemoryAuditStore::list`] when asked for zero.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// One recorded routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Wall clock milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub route_id: String,
    pub order_id: String,
    pub target_id: String,
    pub reason: String,
    pub fallback: bool,
    pub score: f64,
    /// Number of candidates the decision was made over.
    pub target_count: usize,
}

/// Audit sink interface.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an audit entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

#[async_trait]
impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry).await
    }
}

/// Simple audit sink that logs via tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        info!(
            target: "smart_order_router::audit",
            route_id = %entry.route_id,
            order_id = %entry.order_id,
            target_id = %entry.target_id,
            reason = %entry.reason,
            fallback = entry.fallback,
            score = entry.score,
            target_count = entry.target_count,
            "audit"
        );
        Ok(())
    }
}

/// Bounded in-memory audit store; the oldest entry is evicted first.
#[derive(Clone, Debug)]
pub struct MemoryAuditStore {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
    capacity: usize,
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(256)))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Append `entry`, evicting the oldest entries past capacity.
    pub async fn push(&self, entry: AuditEntry) {
        let mut guard = self.entries.lock().await;
        guard.push_back(entry);
        while guard.len() > self.capacity {
            guard.pop_front();
        }
    }

    /// Most recent `limit` entries, newest first. Zero means [`DEFAULT_LIST_LIMIT`].
    pub async fn list(&self, limit: usize) -> Vec<AuditEntry> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        self.entries.lock().await.iter().rev().take(limit).cloned().collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditStore {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.push(entry).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> AuditEntry {
        AuditEntry {
            timestamp: n as u64,
            route_id: format!("route-{}", n),
            order_id: format!("order-{}", n),
            target_id: "venue".into(),
            reason: "best-latency".into(),
            fallback: false,
            score: 1.0,
            target_count: 1,
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_default_limit() -> Result<(), AuditError> {
        let store = MemoryAuditStore::new();
        for i in 0..60 {
            store.record(entry(i)).await?;
        }
        let listed = store.list(0).await;
        assert_eq!(listed.len(), DEFAULT_LIST_LIMIT);
        assert_eq!(listed[0].route_id, "route-59");
        assert_eq!(listed[49].route_id, "route-10");

        let three = store.list(3).await;
        let ids: Vec<_> = three.iter().map(|e| e.route_id.as_str()).collect();
        assert_eq!(ids, ["route-59", "route-58", "route-57"]);
        Ok(())
    }

    #[tokio::test]
    async fn limit_above_len_returns_everything() -> Result<(), AuditError> {
        let store = MemoryAuditStore::new();
        store.record(entry(1)).await?;
        store.record(entry(2)).await?;
        assert_eq!(store.list(500).await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn evicts_oldest_beyond_capacity() -> Result<(), AuditError> {
        let store = MemoryAuditStore::with_capacity(100);
        for i in 0..150 {
            store.record(entry(i)).await?;
        }
        assert_eq!(store.len().await, 100);
        let all = store.list(1_000).await;
        assert_eq!(all.first().map(|e| e.route_id.as_str()), Some("route-149"));
        assert_eq!(all.last().map(|e| e.route_id.as_str()), Some("route-50"));
        Ok(())
    }

    #[tokio::test]
    async fn push_and_record_share_one_history() -> Result<(), AuditError> {
        let store = MemoryAuditStore::with_capacity(2);
        store.push(entry(1)).await;
        store.record(entry(2)).await?;
        store.push(entry(3)).await;
        let ids: Vec<_> = store.list(0).await.into_iter().map(|e| e.route_id).collect();
        assert_eq!(ids, ["route-3", "route-2"]);
        Ok(())
    }

    #[test]
    fn default_capacity_matches_retention() {
        assert_eq!(MemoryAuditStore::default().capacity(), 1_000);
        assert_eq!(MemoryAuditStore::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn entry_serializes_camel_case() {
        let json = serde_json::to_value(entry(7)).unwrap();
        assert_eq!(json["routeId"], "route-7");
        assert_eq!(json["targetCount"], 1);
    }
}
