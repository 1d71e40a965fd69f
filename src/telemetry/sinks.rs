use super::events::RoutingEvent;
use futures::future::{ready, Ready};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tower::Service;

/// A telemetry sink that consumes routing events.
pub trait TelemetrySink:
    tower::Service<RoutingEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    /// The error type for this sink.
    type SinkError: std::error::Error + Send + 'static;
}

/// Best-effort emit helper that honors `poll_ready` and swallows errors.
pub async fn emit_best_effort<S>(sink: S, event: RoutingEvent)
where
    S: tower::Service<RoutingEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    use tower::ServiceExt;

    if let Ok(mut ready_sink) = sink.ready_oneshot().await {
        if let Err(e) = ready_sink.call(event).await {
            tracing::debug!(error = %e, "telemetry sink dropped event");
        }
    }
}

/// A no-op telemetry sink that discards all events.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl Service<RoutingEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: RoutingEvent) -> Self::Future {
        ready(Ok(()))
    }
}

impl TelemetrySink for NullSink {
    type SinkError = Infallible;
}

/// A telemetry sink that logs events using the `tracing` crate.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Service<RoutingEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RoutingEvent) -> Self::Future {
        tracing::info!(outcome = event.outcome(), event = %event, "routing_event");
        ready(Ok(()))
    }
}

impl TelemetrySink for LogSink {
    type SinkError = Infallible;
}

/// A telemetry sink that keeps the most recent events in memory.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RoutingEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn events(&self) -> Vec<RoutingEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RoutingEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<RoutingEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RoutingEvent) -> Self::Future {
        let mut guard = self.lock();
        if guard.len() >= self.capacity {
            guard.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push(event);
        ready(Ok(()))
    }
}

impl TelemetrySink for MemorySink {
    type SinkError = Infallible;
}

/// Which side of a [`FanoutSink`] rejected an event.
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("primary telemetry sink failed: {0}")]
    Primary(#[source] BoxError),
    #[error("secondary telemetry sink failed: {0}")]
    Secondary(#[source] BoxError),
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sends every routing event to two sinks, e.g. an in-process [`MemorySink`]
/// next to an exporter.
///
/// Each side is driven to readiness before it is called. Both sides always
/// see the event; when both fail, the primary failure is reported.
#[derive(Clone, Debug)]
pub struct FanoutSink<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FanoutSink<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &A {
        &self.primary
    }

    pub fn secondary(&self) -> &B {
        &self.secondary
    }
}

async fn deliver<S>(sink: S, event: RoutingEvent) -> Result<(), BoxError>
where
    S: Service<RoutingEvent, Response = ()>,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    use tower::ServiceExt;

    sink.oneshot(event).await.map_err(|e| Box::new(e) as BoxError)
}

impl<A, B> Service<RoutingEvent> for FanoutSink<A, B>
where
    A: Service<RoutingEvent, Response = ()> + Clone + Send + 'static,
    A::Error: std::error::Error + Send + Sync + 'static,
    A::Future: Send + 'static,
    B: Service<RoutingEvent, Response = ()> + Clone + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
    B::Future: Send + 'static,
{
    type Response = ();
    type Error = FanoutError;
    type Future = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RoutingEvent) -> Self::Future {
        let primary = deliver(self.primary.clone(), event.clone());
        let secondary = deliver(self.secondary.clone(), event);

        Box::pin(async move {
            let (first, second) = tokio::join!(primary, secondary);
            first.map_err(FanoutError::Primary)?;
            second.map_err(FanoutError::Secondary)
        })
    }
}

impl<A, B> TelemetrySink for FanoutSink<A, B>
where
    A: Service<RoutingEvent, Response = ()> + Clone + Send + 'static,
    A::Error: std::error::Error + Send + Sync + 'static,
    A::Future: Send + 'static,
    B: Service<RoutingEvent, Response = ()> + Clone + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
    B::Future: Send + 'static,
{
    type SinkError = FanoutError;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::events::RejectionKind;
    use std::time::Duration;

    #[derive(Clone)]
    struct Fails;

    impl TelemetrySink for Fails {
        type SinkError = std::io::Error;
    }

    impl tower::Service<RoutingEvent> for Fails {
        type Response = ();
        type Error = std::io::Error;
        type Future = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send>>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, _req: RoutingEvent) -> Self::Future {
            Box::pin(async { Err(std::io::Error::new(std::io::ErrorKind::Other, "fail")) })
        }
    }

    fn decision(target: &str) -> RoutingEvent {
        RoutingEvent::Decision {
            target_id: target.into(),
            fallback: false,
            target_count: 2,
            duration: Duration::from_micros(80),
        }
    }

    #[tokio::test]
    async fn test_null_sink() {
        let mut sink = NullSink;
        sink.call(RoutingEvent::RateLimited).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_sink_evicts_oldest() {
        let mut sink = MemorySink::with_capacity(2);
        assert!(sink.is_empty());

        let event1 = decision("a");
        let event2 = RoutingEvent::RateLimited;
        let event3 = RoutingEvent::Rejected { kind: RejectionKind::Invalid };

        sink.call(event1).await.unwrap();
        sink.call(event2.clone()).await.unwrap();
        sink.call(event3.clone()).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.evicted(), 1);
        assert_eq!(sink.events(), vec![event2, event3]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_fanout_delivers_to_both() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let mut sink = FanoutSink::new(a.clone(), b.clone());
        sink.call(decision("x")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.events(), vec![decision("x")]);
    }

    #[tokio::test]
    async fn test_fanout_reports_failing_side_after_delivering() {
        let healthy = MemorySink::new();
        let mut sink = FanoutSink::new(healthy.clone(), Fails);
        let err = sink.call(RoutingEvent::RateLimited).await.unwrap_err();
        assert!(matches!(err, FanoutError::Secondary(_)));
        assert_eq!(healthy.events(), vec![RoutingEvent::RateLimited]);

        let mut sink = FanoutSink::new(Fails, healthy.clone());
        let err = sink.call(RoutingEvent::RateLimited).await.unwrap_err();
        assert!(err.to_string().starts_with("primary"));
        assert_eq!(healthy.len(), 2);
    }

    #[tokio::test]
    async fn test_emit_best_effort_swallows_errors() {
        emit_best_effort(Fails, RoutingEvent::RateLimited).await;
    }

    #[tokio::test]
    async fn test_log_sink() {
        let mut sink = LogSink;
        sink.call(decision("a")).await.unwrap();
    }
}
