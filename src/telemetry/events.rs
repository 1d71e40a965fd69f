use std::fmt;
use std::time::Duration;

/// Events emitted by the router once per finished request.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingEvent {
    /// A target was chosen.
    Decision {
        /// Chosen target id.
        target_id: String,
        /// True when no candidate met the availability bar.
        fallback: bool,
        /// Number of candidates considered.
        target_count: usize,
        /// Time from admission to decision.
        duration: Duration,
    },
    /// The client exhausted its admission window.
    RateLimited,
    /// The request was refused before a decision could be made.
    Rejected {
        kind: RejectionKind,
    },
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// Field validation failed.
    Invalid,
    /// The candidate list was empty.
    NoTargets,
}

impl RoutingEvent {
    /// Short label used by exporters (`decision`, `fallback`, `rate_limited`, ...).
    pub fn outcome(&self) -> &'static str {
        match self {
            RoutingEvent::Decision { fallback: false, .. } => "decision",
            RoutingEvent::Decision { fallback: true, .. } => "fallback",
            RoutingEvent::RateLimited => "rate_limited",
            RoutingEvent::Rejected { kind: RejectionKind::Invalid } => "invalid",
            RoutingEvent::Rejected { kind: RejectionKind::NoTargets } => "no_targets",
        }
    }
}

impl fmt::Display for RoutingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingEvent::Decision { target_id, fallback, target_count, duration } => write!(
                f,
                "Decision(target={}, fallback={}, candidates={}, took={:?})",
                target_id, fallback, target_count, duration
            ),
            RoutingEvent::RateLimited => write!(f, "RateLimited"),
            RoutingEvent::Rejected { kind } => write!(f, "Rejected({:?})", kind),
        }
    }
}
