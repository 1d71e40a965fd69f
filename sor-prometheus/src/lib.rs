//! Prometheus metrics sink for `smart-order-router`.
//! Bring your own `prometheus::Registry`; metrics are registered into it and
//! updated on every routing event.
//!
//! - `sor_decisions_total{outcome}`: one increment per finished request, with
//!   `outcome` one of `decision`, `fallback`, `rate_limited`, `invalid`,
//!   `no_targets`.
//! - `sor_decision_duration_seconds{fallback}`: decision latency histogram.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use smart_order_router::telemetry::{RoutingEvent, TelemetrySink};
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};

const LATENCY_BUCKETS: &[f64] =
    &[0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25];

#[derive(Clone, Debug)]
pub struct PrometheusSink {
    registry: Arc<Registry>,
    decisions: IntCounterVec,
    latency: HistogramVec,
}

impl PrometheusSink {
    /// Create a sink and register its metrics into the provided registry.
    ///
    /// # Errors
    /// Returns an error if a metric cannot be registered (e.g. name conflict).
    pub fn new<R: Into<Arc<Registry>>>(registry: R) -> Result<Self, prometheus::Error> {
        let registry = registry.into();
        let decisions = IntCounterVec::new(
            Opts::new("sor_decisions_total", "Routing requests by outcome"),
            &["outcome"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("sor_decision_duration_seconds", "Routing decision latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["fallback"],
        )?;
        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        tracing::debug!("registered routing metrics");
        Ok(Self { registry, decisions, latency })
    }

    /// Expose the registry for HTTP scraping.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl tower_service::Service<RoutingEvent> for PrometheusSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RoutingEvent) -> Self::Future {
        self.decisions.with_label_values(&[event.outcome()]).inc();
        if let RoutingEvent::Decision { fallback, duration, .. } = &event {
            let label = if *fallback { "true" } else { "false" };
            self.latency.with_label_values(&[label]).observe(duration.as_secs_f64());
        }
        ready(Ok(()))
    }
}

impl TelemetrySink for PrometheusSink {
    type SinkError = Infallible;
}
