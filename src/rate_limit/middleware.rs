use crate::clock::{Clock, SystemClock};
use crate::error::AdmissionError;
use crate::rate_limit::RateLimiter;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Derives the admission key (usually the client address) from a request.
pub trait KeyExtractor<Req>: Send + Sync {
    fn key(&self, req: &Req) -> String;
}

impl<Req, F> KeyExtractor<Req> for F
where
    F: Fn(&Req) -> String + Send + Sync,
{
    fn key(&self, req: &Req) -> String {
        self(req)
    }
}

/// A layer that admits requests through a [`RateLimiter`] before they reach the service.
pub struct RateLimitLayer<L, K> {
    limiter: Arc<L>,
    extractor: Arc<K>,
    clock: Arc<dyn Clock>,
}

impl<L, K> Clone for RateLimitLayer<L, K> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), extractor: self.extractor.clone(), clock: self.clock.clone() }
    }
}

impl<L, K> RateLimitLayer<L, K> {
    /// Create a new rate limit layer reading the wall clock.
    pub fn new(limiter: Arc<L>, extractor: K) -> Self {
        Self { limiter, extractor: Arc::new(extractor), clock: Arc::new(SystemClock) }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl<S, L, K> Layer<S> for RateLimitLayer<L, K> {
    type Service = RateLimitService<S, L, K>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            extractor: self.extractor.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Middleware service that rejects over-limit requests without calling `inner`.
pub struct RateLimitService<S, L, K> {
    inner: S,
    limiter: Arc<L>,
    extractor: Arc<K>,
    clock: Arc<dyn Clock>,
}

impl<S: Clone, L, K> Clone for RateLimitService<S, L, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            extractor: self.extractor.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S, L, K, Req> Service<Req> for RateLimitService<S, L, K>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    L: RateLimiter + 'static,
    K: KeyExtractor<Req> + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = AdmissionError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AdmissionError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.extractor.key(&req);
        if !self.limiter.allow(&key, self.clock.now_millis()) {
            tracing::warn!(client = %key, "rate limit exceeded");
            return Box::pin(async move { Err(AdmissionError::RateLimited { key }) });
        }

        // Take the service that was driven ready and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await.map_err(AdmissionError::Inner) })
    }
}
