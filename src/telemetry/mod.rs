//! Telemetry for routing decisions.
//!
//! The router emits a [`RoutingEvent`] for every request it finishes, whether
//! it produced a decision or turned the request away. Events flow through
//! `TelemetrySink` implementations, which are `tower::Service<RoutingEvent>`
//! so they compose like any other service.
//!
//! Decision events carry the elapsed decision latency and whether the
//! fallback policy fired; exporters such as the Prometheus sink turn those
//! into counters and histograms.

pub mod events;
pub mod sinks;

pub use events::{RejectionKind, RoutingEvent};
pub use sinks::{
    emit_best_effort, FanoutError, FanoutSink, LogSink, MemorySink, NullSink,
    TelemetrySink,
};
