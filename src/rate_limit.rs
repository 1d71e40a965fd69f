//! Per-client admission control.
//!
//! - [`RateLimiter`]: the admission decision, one call per request.
//! - [`FixedWindowLimiter`]: counts requests per key in discrete windows.
//! - [`RateLimitLayer`]: Tower middleware that asks a limiter before forwarding.
//!
//! # Fixed windows
//!
//! A key's window starts with its first request and is replaced wholesale once
//! `window` has elapsed, so a client can land `max_requests` at the tail of one
//! window and `max_requests` more right after the boundary. Rejection is
//! immediate; nothing queues or blocks.

pub mod fixed_window;
pub mod middleware;

pub use fixed_window::{FixedWindowLimiter, RateBucket};
pub use middleware::{KeyExtractor, RateLimitLayer, RateLimitService};

/// Core interface for admission decisions.
pub trait RateLimiter: Send + Sync {
    /// Decide whether `key` may proceed at `now_millis`. The return value is
    /// the only signal; a rejection is not an error.
    fn allow(&self, key: &str, now_millis: u64) -> bool;
}

impl<L: RateLimiter + ?Sized> RateLimiter for std::sync::Arc<L> {
    fn allow(&self, key: &str, now_millis: u64) -> bool {
        (**self).allow(key, now_millis)
    }
}

/// Derive a client key from forwarding headers and the peer address.
///
/// Precedence: first element of `X-Forwarded-For`, then `X-Real-IP`, then the
/// host part of `remote_addr`, then `remote_addr` verbatim when it has no port.
pub fn client_key(forwarded_for: Option<&str>, real_ip: Option<&str>, remote_addr: &str) -> String {
    if let Some(forwarded) = forwarded_for.filter(|v| !v.is_empty()) {
        let first = forwarded.split(',').next().unwrap_or_default();
        return first.trim().to_string();
    }
    if let Some(real) = real_ip.filter(|v| !v.is_empty()) {
        return real.trim().to_string();
    }
    match remote_addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => remote_addr.to_string(),
    }
}
