//! Error types for the routing core and its collaborators.
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by target selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Selection was asked to choose from an empty candidate list.
    #[error("no targets provided")]
    NoTargets,
}

/// A route request that failed field validation. The message names the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Human readable description of the offending field.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced when validating limiter, cache, or router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Admission limit must be > 0.
    #[error("max_requests must be > 0 (got {provided})")]
    InvalidMaxRequests {
        /// Value provided by caller.
        provided: u32,
    },
    /// Rate window must be > 0.
    #[error("rate window must be > 0 (got {0:?})")]
    InvalidWindow(Duration),
    /// Metric time-to-live must be > 0.
    #[error("metric ttl must be > 0 (got {0:?})")]
    InvalidTtl(Duration),
    /// Audit retention must hold at least one entry.
    #[error("audit capacity must be > 0 (got {provided})")]
    InvalidAuditCapacity {
        /// Value provided by caller.
        provided: usize,
    },
}

/// Errors raised by audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Writing the entry to its destination failed.
    #[error("audit write failed: {0}")]
    Io(#[from] std::io::Error),
    /// The entry could not be encoded.
    #[error("audit encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Terminal outcome of a single routing request that did not produce a decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// The client exhausted its admission window.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Key the limiter rejected.
        key: String,
    },
    /// The request failed field validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The selector could not produce a decision.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl RouteError {
    /// Check if this error is an admission rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if the caller supplied a bad request (validation or empty target list).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::Selection(_))
    }
}

/// Error returned by the admission middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError<E> {
    /// The limiter rejected the request; the inner service was not called.
    RateLimited {
        /// Key the limiter rejected.
        key: String,
    },
    /// The wrapped service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for AdmissionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { key } => write!(f, "rate limit exceeded for {}", key),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AdmissionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited { .. } => None,
        }
    }
}

impl<E> AdmissionError<E> {
    /// Check if this error is an admission rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
