//! Routing candidates and the decisions made over them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate downstream destination for an order.
///
/// Fields are assumed well-formed on entry to the core: `id` non-empty,
/// `latency_ms >= 0`, `availability` within `[0, 1]`. Lower `priority`
/// numbers take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latency_ms: i64,
    pub availability: f64,
    #[serde(default)]
    pub priority: i32,
}

impl Target {
    /// Build a target with an empty display name.
    pub fn new(id: impl Into<String>, latency_ms: i64, availability: f64, priority: i32) -> Self {
        Self { id: id.into(), name: String::new(), latency_ms, availability, priority }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Why the selector chose its winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// At least one target met the availability bar; the best of those won.
    #[serde(rename = "best-latency")]
    BestLatency,
    /// No target met the availability bar; the best of all candidates won.
    #[serde(rename = "fallback-no-healthy-targets")]
    FallbackNoHealthyTargets,
}

impl Reason {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::BestLatency => "best-latency",
            Reason::FallbackNoHealthyTargets => "fallback-no-healthy-targets",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of [`select_target`](crate::selector::select_target).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Copy of the winning input target.
    pub target: Target,
    /// Ranking value; the winner's latency.
    pub score: f64,
    /// True when no target met the availability bar.
    pub fallback: bool,
    pub reason: Reason,
}
