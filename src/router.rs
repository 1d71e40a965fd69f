//! The routing decision path: admission, smoothing, selection, then audit and telemetry.
//!
//! [`RoutingCore`] owns one [`FixedWindowLimiter`] and one [`MetricCache`] and
//! shares them across every caller. Each component guards its own map, so
//! admission and smoothing never contend with each other, and selection takes
//! no lock at all.
//!
//! # Example
//! ```
//! use smart_order_router::{RouteRequest, RouterConfig, RoutingCore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let core = RoutingCore::builder(RouterConfig::default()).build().unwrap();
//! let request: RouteRequest = serde_json::from_str(r#"{
//!     "order": {"id": "o-1", "symbol": "PETR4", "quantity": 100, "side": "buy"},
//!     "targets": [
//!         {"id": "A", "latencyMs": 50, "availability": 0.9, "priority": 1},
//!         {"id": "B", "latencyMs": 30, "availability": 0.95, "priority": 2}
//!     ]
//! }"#).unwrap();
//!
//! let outcome = core.route("203.0.113.7", request).await.unwrap();
//! assert_eq!(outcome.decision.target.id, "B");
//! # }
//! ```

use crate::audit::{AuditEntry, AuditSink, MemoryAuditStore};
use crate::cache::MetricCache;
use crate::clock::{Clock, SystemClock};
use crate::config::RouterConfig;
use crate::error::{ConfigError, RouteError, SelectionError};
use crate::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::request::RouteRequest;
use crate::selector::select_target;
use crate::target::{Decision, Target};
use crate::telemetry::{emit_best_effort, NullSink, RejectionKind, RoutingEvent, TelemetrySink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A successful routing decision and its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// Caller supplied id, or a generated one.
    pub route_id: String,
    pub decision: Decision,
    /// Time from admission to decision.
    pub duration: Duration,
    /// True when `duration` exceeded the configured latency budget.
    pub budget_exceeded: bool,
}

/// Orchestrates one decision per inbound request.
pub struct RoutingCore<T = NullSink> {
    limiter: Arc<FixedWindowLimiter>,
    cache: Arc<MetricCache>,
    clock: Arc<dyn Clock>,
    history: MemoryAuditStore,
    audit: Option<Arc<dyn AuditSink>>,
    telemetry: T,
    config: RouterConfig,
}

impl RoutingCore<NullSink> {
    pub fn builder(config: RouterConfig) -> RoutingCoreBuilder<NullSink> {
        RoutingCoreBuilder { config, clock: Arc::new(SystemClock), audit: None, telemetry: NullSink }
    }
}

impl<T> RoutingCore<T>
where
    T: TelemetrySink,
    T::Future: Send + 'static,
{
    /// Admit, validate, and route one request from `client_key`.
    ///
    /// # Errors
    /// - [`RouteError::RateLimited`] when the client's window is exhausted.
    /// - [`RouteError::Invalid`] when the request fails validation.
    /// - [`RouteError::Selection`] when there is nothing to choose from.
    pub async fn route(&self, client_key: &str, request: RouteRequest) -> Result<RouteOutcome, RouteError> {
        let started = Instant::now();
        let now = self.clock.now_millis();

        if !self.limiter.allow(client_key, now) {
            warn!(client = client_key, "rate limit exceeded");
            self.emit(RoutingEvent::RateLimited).await;
            return Err(RouteError::RateLimited { key: client_key.to_string() });
        }

        if let Err(e) = request.validate() {
            debug!(client = client_key, error = %e, "validation failed");
            self.emit(RoutingEvent::Rejected { kind: RejectionKind::Invalid }).await;
            return Err(e.into());
        }

        let route_id = if request.route_id.trim().is_empty() {
            new_route_id()
        } else {
            request.route_id.clone()
        };

        let targets = request.targets();
        let decision = match self.decide(&targets, now) {
            Ok(decision) => decision,
            Err(e) => {
                debug!(route_id = %route_id, "no targets provided");
                self.emit(RoutingEvent::Rejected { kind: RejectionKind::NoTargets }).await;
                return Err(e.into());
            }
        };

        let duration = started.elapsed();
        let budget_exceeded = duration > self.config.latency_budget();
        let duration_ms = duration.as_secs_f64() * 1_000.0;
        if budget_exceeded {
            warn!(
                route_id = %route_id,
                target = %decision.target.id,
                fallback = decision.fallback,
                duration_ms,
                "routing decision exceeded latency budget"
            );
        } else {
            info!(
                route_id = %route_id,
                target = %decision.target.id,
                fallback = decision.fallback,
                duration_ms,
                "routing decision"
            );
        }

        self.emit(RoutingEvent::Decision {
            target_id: decision.target.id.clone(),
            fallback: decision.fallback,
            target_count: targets.len(),
            duration,
        })
        .await;

        self.record(AuditEntry {
            timestamp: self.clock.now_millis(),
            route_id: route_id.clone(),
            order_id: request.order.id.clone(),
            target_id: decision.target.id.clone(),
            reason: decision.reason.to_string(),
            fallback: decision.fallback,
            score: decision.score,
            target_count: targets.len(),
        })
        .await;

        Ok(RouteOutcome { route_id, decision, duration, budget_exceeded })
    }

    async fn emit(&self, event: RoutingEvent) {
        emit_best_effort(self.telemetry.clone(), event).await;
    }
}

impl<T> RoutingCore<T> {
    /// Smooth `targets` through the shared cache and select a winner, without
    /// admission, audit, or telemetry.
    ///
    /// # Errors
    /// Returns [`SelectionError::NoTargets`] for an empty list.
    pub fn decide(&self, targets: &[Target], now_millis: u64) -> Result<Decision, SelectionError> {
        let merged = self.cache.merge(targets, now_millis);
        select_target(&merged)
    }

    /// Most recent decisions, newest first. `None` uses the configured default.
    pub async fn recent_decisions(&self, limit: Option<usize>) -> Vec<AuditEntry> {
        self.history.list(limit.unwrap_or(self.config.audit_list_limit())).await
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<MetricCache> {
        &self.cache
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    async fn record(&self, entry: AuditEntry) {
        self.history.push(entry.clone()).await;
        if let Some(sink) = &self.audit {
            if let Err(e) = sink.record(entry).await {
                warn!(error = %e, "audit sink failed");
            }
        }
    }
}

/// Wires a [`RoutingCore`] from configuration and optional collaborators.
pub struct RoutingCoreBuilder<T> {
    config: RouterConfig,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<dyn AuditSink>>,
    telemetry: T,
}

impl<T> RoutingCoreBuilder<T> {
    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Forward every audit entry to `sink` as well as the in-memory history.
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Replace the telemetry sink.
    pub fn with_telemetry<S: TelemetrySink>(self, telemetry: S) -> RoutingCoreBuilder<S> {
        RoutingCoreBuilder { config: self.config, clock: self.clock, audit: self.audit, telemetry }
    }

    /// # Errors
    /// Returns [`ConfigError`] if the limiter or cache rejects the configuration.
    pub fn build(self) -> Result<RoutingCore<T>, ConfigError> {
        let limiter = FixedWindowLimiter::new(self.config.max_requests(), self.config.window())?;
        let cache = MetricCache::new(self.config.metric_ttl())?;
        Ok(RoutingCore {
            limiter: Arc::new(limiter),
            cache: Arc::new(cache),
            clock: self.clock,
            history: MemoryAuditStore::with_capacity(self.config.audit_capacity()),
            audit: self.audit,
            telemetry: self.telemetry,
            config: self.config,
        })
    }
}

fn new_route_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::request::{OrderRequest, TargetInput};
    use crate::target::Reason;
    use crate::telemetry::{FanoutSink, MemorySink};

    fn request(targets: &[(&str, i64, f64, i32)]) -> RouteRequest {
        RouteRequest {
            route_id: String::new(),
            order: OrderRequest {
                id: "ord-1".into(),
                symbol: "VALE3".into(),
                quantity: 10,
                side: "sell".into(),
            },
            targets: targets
                .iter()
                .map(|&(id, latency_ms, availability, priority)| TargetInput {
                    id: id.into(),
                    name: String::new(),
                    latency_ms,
                    availability,
                    priority,
                })
                .collect(),
        }
    }

    fn build_core(max_requests: u32) -> (RoutingCore<MemorySink>, ManualClock, MemorySink) {
        let clock = ManualClock::new(1_000);
        let sink = MemorySink::new();
        let config = RouterConfig::builder().max_requests(max_requests).build().unwrap();
        let core = RoutingCore::builder(config)
            .with_clock(clock.clone())
            .with_telemetry(sink.clone())
            .build()
            .unwrap();
        (core, clock, sink)
    }

    #[tokio::test]
    async fn routes_and_records() {
        let (core, _clock, sink) = build_core(10);
        let outcome =
            core.route("c1", request(&[("A", 50, 0.9, 1), ("B", 30, 0.95, 2)])).await.unwrap();
        assert_eq!(outcome.decision.target.id, "B");
        assert_eq!(outcome.decision.reason, Reason::BestLatency);
        assert_eq!(outcome.route_id.len(), 32);

        let audit = core.recent_decisions(None).await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].target_id, "B");
        assert_eq!(audit[0].order_id, "ord-1");
        assert_eq!(audit[0].target_count, 2);
        assert_eq!(audit[0].timestamp, 1_000);
        assert_eq!(audit[0].route_id, outcome.route_id);

        assert!(matches!(sink.events()[0], RoutingEvent::Decision { fallback: false, .. }));
    }

    #[tokio::test]
    async fn caller_route_id_is_kept() {
        let (core, _clock, _sink) = build_core(10);
        let mut req = request(&[("A", 1, 1.0, 1)]);
        req.route_id = "route-42".into();
        assert_eq!(core.route("c1", req).await.unwrap().route_id, "route-42");
    }

    #[tokio::test]
    async fn rate_limited_before_validation() {
        let (core, clock, sink) = build_core(1);
        assert!(core.route("c1", request(&[("A", 1, 1.0, 1)])).await.is_ok());
        let err = core.route("c1", request(&[])).await.unwrap_err();
        assert_eq!(err, RouteError::RateLimited { key: "c1".into() });
        assert_eq!(sink.events().last(), Some(&RoutingEvent::RateLimited));

        clock.advance(60_000);
        assert!(core.route("c1", request(&[("A", 1, 1.0, 1)])).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_request_is_not_audited() {
        let (core, _clock, sink) = build_core(10);
        let err = core.route("c1", request(&[])).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(core.recent_decisions(None).await.is_empty());
        assert_eq!(sink.events(), vec![RoutingEvent::Rejected { kind: RejectionKind::Invalid }]);
    }

    #[tokio::test]
    async fn smoothing_is_shared_across_clients() {
        let (core, clock, _sink) = build_core(10);
        core.route("c1", request(&[("A", 10, 0.9, 1), ("B", 40, 0.9, 2)])).await.unwrap();
        clock.advance(1_000);
        // A spikes, B improves; smoothed A = 55, B = 30
        let outcome =
            core.route("c2", request(&[("A", 100, 0.9, 1), ("B", 20, 0.9, 2)])).await.unwrap();
        assert_eq!(outcome.decision.target.id, "B");
        assert_eq!(outcome.decision.score, 30.0);
    }

    #[tokio::test]
    async fn fanout_telemetry_sees_every_outcome() {
        let (primary, secondary) = (MemorySink::new(), MemorySink::new());
        let config = RouterConfig::builder().max_requests(2).build().unwrap();
        let core = RoutingCore::builder(config)
            .with_clock(ManualClock::new(0))
            .with_telemetry(FanoutSink::new(primary.clone(), secondary.clone()))
            .build()
            .unwrap();

        core.route("c1", request(&[("X", 10, 0.1, 1)])).await.unwrap();
        core.route("c1", request(&[])).await.unwrap_err();
        core.route("c1", request(&[("X", 10, 0.1, 1)])).await.unwrap_err();

        let outcomes: Vec<_> = primary.events().iter().map(RoutingEvent::outcome).collect();
        assert_eq!(outcomes, ["fallback", "invalid", "rate_limited"]);
        assert_eq!(secondary.events(), primary.events());
        assert_eq!(core.recent_decisions(None).await.len(), 1);
    }

    #[test]
    fn decide_without_admission() {
        let core = RoutingCore::builder(RouterConfig::default()).build().unwrap();
        assert_eq!(core.decide(&[], 0), Err(SelectionError::NoTargets));
        let d = core.decide(&[Target::new("X", 10, 0.1, 1), Target::new("Y", 5, 0.2, 2)], 0).unwrap();
        assert!(d.fallback);
        assert_eq!(d.target.id, "Y");
        assert_eq!(core.cache().len(), 2);
    }
}
