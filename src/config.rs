//! Router configuration.

use crate::audit::{DEFAULT_AUDIT_CAPACITY, DEFAULT_LIST_LIMIT};
use crate::error::ConfigError;
use std::time::Duration;

/// Default admissions per client per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 120;
/// Default admission window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default metric smoothing ttl.
pub const DEFAULT_METRIC_TTL: Duration = Duration::from_secs(30);
/// Decisions slower than this are logged at `warn`.
pub const DEFAULT_LATENCY_BUDGET: Duration = Duration::from_millis(50);

/// Environment variable overriding the per-window admission limit.
pub const RATE_LIMIT_ENV: &str = "RATE_LIMIT_PER_MIN";

/// Validated configuration for [`RoutingCore`](crate::router::RoutingCore).
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    max_requests: u32,
    window: Duration,
    metric_ttl: Duration,
    audit_capacity: usize,
    audit_list_limit: usize,
    latency_budget: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            metric_ttl: DEFAULT_METRIC_TTL,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            audit_list_limit: DEFAULT_LIST_LIMIT,
            latency_budget: DEFAULT_LATENCY_BUDGET,
        }
    }
}

impl RouterConfig {
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }

    /// Defaults, with the admission limit taken from `RATE_LIMIT_PER_MIN` when
    /// it holds a positive integer.
    pub fn from_env() -> Self {
        let raw = std::env::var(RATE_LIMIT_ENV).ok();
        Self { max_requests: parse_limit(raw.as_deref(), DEFAULT_MAX_REQUESTS), ..Self::default() }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn metric_ttl(&self) -> Duration {
        self.metric_ttl
    }

    pub fn audit_capacity(&self) -> usize {
        self.audit_capacity
    }

    /// Entries returned by an audit listing that does not name a limit.
    pub fn audit_list_limit(&self) -> usize {
        self.audit_list_limit
    }

    pub fn latency_budget(&self) -> Duration {
        self.latency_budget
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidMaxRequests { provided: 0 });
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidWindow(self.window));
        }
        if self.metric_ttl.is_zero() {
            return Err(ConfigError::InvalidTtl(self.metric_ttl));
        }
        if self.audit_capacity == 0 {
            return Err(ConfigError::InvalidAuditCapacity { provided: 0 });
        }
        Ok(())
    }
}

/// Builder for [`RouterConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl RouterConfigBuilder {
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.config.max_requests = max_requests;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn metric_ttl(mut self, ttl: Duration) -> Self {
        self.config.metric_ttl = ttl;
        self
    }

    pub fn audit_capacity(mut self, capacity: usize) -> Self {
        self.config.audit_capacity = capacity;
        self
    }

    /// Zero keeps the default of 50.
    pub fn audit_list_limit(mut self, limit: usize) -> Self {
        self.config.audit_list_limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        self
    }

    pub fn latency_budget(mut self, budget: Duration) -> Self {
        self.config.latency_budget = budget;
        self
    }

    /// # Errors
    /// Returns [`ConfigError`] for a zero limit, window, ttl, or audit capacity.
    pub fn build(self) -> Result<RouterConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_limit(raw: Option<&str>, fallback: u32) -> u32 {
    match raw.map(str::trim).filter(|v| !v.is_empty()).map(str::parse::<u32>) {
        Some(Ok(value)) if value > 0 => value,
        _ => fallback,
    }
}
