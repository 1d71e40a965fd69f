//! Inbound route requests and their validation.

use crate::error::ValidationError;
use crate::target::Target;
use serde::{Deserialize, Serialize};

/// The order being routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderRequest {
    pub id: String,
    pub symbol: String,
    pub quantity: i64,
    pub side: String,
}

/// One candidate as reported by the caller.
///
/// `latencyMs` and `availability` must be present: a candidate without a
/// measurement fails to decode instead of being routed as a zero-latency,
/// zero-availability venue. `name` and `priority` default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetInput {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latency_ms: i64,
    pub availability: f64,
    #[serde(default)]
    pub priority: i32,
}

/// A request for one routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteRequest {
    /// Caller supplied correlation id; one is generated when blank.
    #[serde(default)]
    pub route_id: String,
    pub order: OrderRequest,
    pub targets: Vec<TargetInput>,
}

impl RouteRequest {
    /// Check the fields the routing core relies on, stopping at the first problem.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let order = &self.order;
        if order.id.trim().is_empty() {
            return Err(ValidationError::new("order.id is required"));
        }
        if order.symbol.trim().is_empty() {
            return Err(ValidationError::new("order.symbol is required"));
        }
        if order.quantity <= 0 {
            return Err(ValidationError::new("order.quantity must be greater than 0"));
        }
        let side = order.side.trim().to_ascii_lowercase();
        if side != "buy" && side != "sell" {
            return Err(ValidationError::new("order.side must be 'buy' or 'sell'"));
        }
        if self.targets.is_empty() {
            return Err(ValidationError::new("targets must include at least one target"));
        }
        for (idx, target) in self.targets.iter().enumerate() {
            if target.id.trim().is_empty() {
                return Err(ValidationError::new(format!("targets[{}].id is required", idx)));
            }
            if target.latency_ms < 0 {
                return Err(ValidationError::new(format!("targets[{}].latencyMs must be >= 0", idx)));
            }
            if !(0.0..=1.0).contains(&target.availability) {
                return Err(ValidationError::new(format!(
                    "targets[{}].availability must be between 0 and 1",
                    idx
                )));
            }
        }
        Ok(())
    }

    /// Convert the reported candidates into routing targets, in order.
    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|t| Target {
                id: t.id.clone(),
                name: t.name.clone(),
                latency_ms: t.latency_ms,
                availability: t.availability,
                priority: t.priority,
            })
            .collect()
    }
}
