//! Deterministic target selection with an explicit fallback policy.
//!
//! [`select_target`] is a pure function: it holds no state, takes no locks and
//! depends only on its input and [`MIN_AVAILABILITY`].
//!
//! Candidates at or above the availability bar are eligible. The winner is
//! picked from the eligible set when it is non-empty, otherwise from the full
//! list, by a single left-to-right scan that keeps the current best unless a
//! candidate has strictly lower latency, or equal latency and strictly higher
//! availability, or equal latency and availability and a strictly lower
//! priority number. Exact ties keep the earlier element.

use crate::error::SelectionError;
use crate::target::{Decision, Reason, Target};

/// Availability at or above which a target is eligible.
pub const MIN_AVAILABILITY: f64 = 0.5;

/// Choose the target for one order.
///
/// # Errors
/// Returns [`SelectionError::NoTargets`] when `targets` is empty.
pub fn select_target(targets: &[Target]) -> Result<Decision, SelectionError> {
    let mut eligible = targets.iter().filter(|t| t.availability >= MIN_AVAILABILITY).peekable();

    let (winner, fallback, reason) = if eligible.peek().is_some() {
        (pick_best(eligible), false, Reason::BestLatency)
    } else {
        (pick_best(targets.iter()), true, Reason::FallbackNoHealthyTargets)
    };

    let winner = winner.ok_or(SelectionError::NoTargets)?;
    Ok(Decision { target: winner.clone(), score: winner.latency_ms as f64, fallback, reason })
}

fn pick_best<'a>(mut candidates: impl Iterator<Item = &'a Target>) -> Option<&'a Target> {
    let first = candidates.next()?;
    Some(candidates.fold(first, |best, candidate| if beats(candidate, best) { candidate } else { best }))
}

fn beats(candidate: &Target, best: &Target) -> bool {
    if candidate.latency_ms != best.latency_ms {
        return candidate.latency_ms < best.latency_ms;
    }
    if candidate.availability != best.availability {
        return candidate.availability > best.availability;
    }
    candidate.priority < best.priority
}
