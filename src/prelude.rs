//! Convenient re-exports for wiring a router.
pub use crate::{
    audit::{AuditEntry, AuditSink, MemoryAuditStore},
    clock::{Clock, ManualClock, SystemClock},
    config::RouterConfig,
    error::{RouteError, SelectionError},
    rate_limit::{FixedWindowLimiter, RateLimitLayer, RateLimiter},
    request::RouteRequest,
    router::{RouteOutcome, RoutingCore},
    selector::select_target,
    target::{Decision, Reason, Target},
    telemetry::{RoutingEvent, TelemetrySink},
    MetricCache,
};
