use crate::adaptive::DynamicConfig;
use crate::error::ConfigError;
use crate::rate_limit::RateLimiter;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Admission counter for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Reading at which the current window began.
    pub window_start: u64,
}

/// Fixed (non-sliding) window limiter keyed by client.
///
/// All buckets sit behind one mutex; each [`allow`](RateLimiter::allow) is a
/// single read-modify-write under it. Buckets are created on first sight and
/// reset in place, never removed.
///
/// `max_requests` can be retuned while the limiter is in use; the new limit
/// applies from the next call and does not reset open windows.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: DynamicConfig<u32>,
    window: Duration,
    buckets: Mutex<HashMap<String, RateBucket>>,
}

impl FixedWindowLimiter {
    /// Create a limiter admitting `max_requests` per `window` per key.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `max_requests` is zero or `window` is zero.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::InvalidMaxRequests { provided: max_requests });
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidWindow(window));
        }
        Ok(Self {
            max_requests: DynamicConfig::new(max_requests),
            window,
            buckets: Mutex::new(HashMap::new()),
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests.value()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the per-window limit.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidMaxRequests`] for zero.
    pub fn set_max_requests(&self, max_requests: u32) -> Result<(), ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::InvalidMaxRequests { provided: max_requests });
        }
        tracing::info!(max_requests, "rate limit retuned");
        self.max_requests.set(max_requests);
        Ok(())
    }

    /// Number of keys ever seen.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Current bucket for `key`, if it has been seen.
    pub fn bucket(&self, key: &str) -> Option<RateBucket> {
        self.lock().get(key).copied()
    }

    // A panic inside the critical section cannot leave a half-written bucket,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str, now_millis: u64) -> bool {
        let max = self.max_requests.value();
        let window_millis = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        let mut buckets = self.lock();

        let Some(bucket) = buckets.get_mut(key) else {
            buckets.insert(key.to_string(), RateBucket { count: 1, window_start: now_millis });
            return true;
        };

        if now_millis.saturating_sub(bucket.window_start) >= window_millis {
            *bucket = RateBucket { count: 1, window_start: now_millis };
            return true;
        }

        if bucket.count >= max {
            tracing::debug!(key, count = bucket.count, max, "admission rejected");
            return false;
        }

        bucket.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn rejects_invalid_config() {
        assert_eq!(
            FixedWindowLimiter::new(0, WINDOW).unwrap_err(),
            ConfigError::InvalidMaxRequests { provided: 0 }
        );
        assert_eq!(
            FixedWindowLimiter::new(1, Duration::ZERO).unwrap_err(),
            ConfigError::InvalidWindow(Duration::ZERO)
        );
    }

    #[test]
    fn first_request_creates_bucket() {
        let limiter = FixedWindowLimiter::new(1, WINDOW).unwrap();
        assert!(limiter.allow("a", 1_000));
        assert_eq!(limiter.bucket("a"), Some(RateBucket { count: 1, window_start: 1_000 }));
    }

    #[test]
    fn admits_n_then_rejects_within_window() {
        let limiter = FixedWindowLimiter::new(3, WINDOW).unwrap();
        for i in 0..3 {
            assert!(limiter.allow("a", 1_000 + i), "call {} should be admitted", i);
        }
        assert!(!limiter.allow("a", 1_003));
        assert!(!limiter.allow("a", 60_999));
        assert_eq!(limiter.bucket("a").map(|b| b.count), Some(3));
    }

    #[test]
    fn window_resets_at_exact_boundary() {
        let limiter = FixedWindowLimiter::new(2, WINDOW).unwrap();
        assert!(limiter.allow("a", 0));
        assert!(limiter.allow("a", 10));
        assert!(!limiter.allow("a", 59_999));
        assert!(limiter.allow("a", 60_000));
        assert_eq!(limiter.bucket("a"), Some(RateBucket { count: 1, window_start: 60_000 }));
    }

    #[test]
    fn burst_straddling_boundary_is_admitted() {
        let limiter = FixedWindowLimiter::new(2, WINDOW).unwrap();
        // window opens at 0, burst lands at its tail
        assert!(limiter.allow("a", 0));
        assert!(limiter.allow("a", 59_999));
        // a fresh window begins right after the boundary
        assert!(limiter.allow("a", 60_000));
        assert!(limiter.allow("a", 60_001));
        assert!(!limiter.allow("a", 60_002));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, WINDOW).unwrap();
        assert!(limiter.allow("a", 0));
        assert!(!limiter.allow("a", 1));
        assert!(limiter.allow("b", 1));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn clock_going_backwards_stays_in_window() {
        let limiter = FixedWindowLimiter::new(1, WINDOW).unwrap();
        assert!(limiter.allow("a", 100_000));
        assert!(!limiter.allow("a", 5));
    }

    #[test]
    fn retuned_limit_applies_to_open_window() {
        let limiter = FixedWindowLimiter::new(1, WINDOW).unwrap();
        assert!(limiter.allow("a", 0));
        assert!(!limiter.allow("a", 1));
        limiter.set_max_requests(3).unwrap();
        assert!(limiter.allow("a", 2));
        assert!(limiter.allow("a", 3));
        assert!(!limiter.allow("a", 4));
        assert!(limiter.set_max_requests(0).is_err());
        assert_eq!(limiter.max_requests(), 3);
    }

    #[test]
    fn concurrent_callers_never_exceed_limit() {
        let limiter = Arc::new(FixedWindowLimiter::new(100, WINDOW).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..50).filter(|_| limiter.allow("shared", 0)).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }
}
