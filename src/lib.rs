#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Smart Order Router
//!
//! Decides, per incoming order, which downstream venue should receive it.
//!
//! ## Decision path
//!
//! - **Admission control**: a per-client fixed-window counter
//!   ([`FixedWindowLimiter`]) turns away clients that exceed their budget.
//! - **Metric smoothing**: a short-lived cache ([`MetricCache`]) averages each
//!   freshly reported latency/availability with the previous value for the
//!   same target while that value is within its ttl.
//! - **Selection**: a pure function ([`select_target`]) picks the fastest
//!   healthy target, breaking ties on availability then priority, and falls
//!   back to the full candidate list when nothing is healthy.
//!
//! [`RoutingCore`] strings the three together and hands each decision to an
//! audit sink and a telemetry sink.
//!
//! ## Quick Start
//!
//! ```rust
//! use smart_order_router::{select_target, Target};
//!
//! let decision = select_target(&[
//!     Target::new("A", 50, 0.9, 1),
//!     Target::new("B", 30, 0.95, 2),
//! ])
//! .unwrap();
//! assert_eq!(decision.target.id, "B");
//! assert!(!decision.fallback);
//! ```

pub mod adaptive;
pub mod audit;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod prelude;
pub mod rate_limit;
pub mod request;
pub mod router;
pub mod selector;
pub mod target;
pub mod telemetry;

// Re-exports
pub use audit::{AuditEntry, AuditSink, MemoryAuditStore, TracingAuditSink};
pub use cache::{spawn_sweeper, MetricCache, MetricEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RouterConfig, RouterConfigBuilder};
pub use error::{AdmissionError, AuditError, ConfigError, RouteError, SelectionError, ValidationError};
pub use rate_limit::{client_key, FixedWindowLimiter, RateLimitLayer, RateLimiter};
pub use request::{OrderRequest, RouteRequest, TargetInput};
pub use router::{RouteOutcome, RoutingCore, RoutingCoreBuilder};
pub use selector::{select_target, MIN_AVAILABILITY};
pub use target::{Decision, Reason, Target};
