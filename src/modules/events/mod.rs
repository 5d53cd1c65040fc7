//! Event system for the interception pipeline.
//!
//! The handler itself never logs; it emits events and whatever handlers the
//! embedder registered decide what to do with them. Events carry URLs,
//! statuses and reasons only, never cookie values or credentials.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::metrics::MetricsCollector;

/// A request entered the interceptor.
#[derive(Debug, Clone)]
pub struct InterceptedEvent {
    pub url: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

/// An LFS media reference was resolved (or failed to resolve).
#[derive(Debug, Clone)]
pub struct ResolutionEvent {
    pub source: Url,
    pub target: Option<Url>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Structured pre-dispatch event.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub url: Url,
    pub method: Method,
    pub has_auth: bool,
    pub body_size: usize,
    pub timestamp: DateTime<Utc>,
}

/// Structured post-response event.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub url: Url,
    pub method: Method,
    pub status: u16,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RedirectEvent {
    pub from: Url,
    pub to: Url,
    pub hop: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AbortEvent {
    pub url: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum InterceptEvent {
    Intercepted(InterceptedEvent),
    Resolution(ResolutionEvent),
    Dispatched(DispatchEvent),
    Responded(ResponseEvent),
    Redirected(RedirectEvent),
    Aborted(AbortEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &InterceptEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: InterceptEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &InterceptEvent) {
        match event {
            InterceptEvent::Intercepted(req) => {
                log::debug!("intercepted {} {}", req.method, req.url);
            }
            InterceptEvent::Resolution(res) => match (&res.target, &res.error) {
                (Some(target), _) => log::debug!("lfs {} -> {}", res.source, target),
                (None, Some(error)) => log::warn!("lfs {} failed: {}", res.source, error),
                (None, None) => log::warn!("lfs {} failed", res.source),
            },
            InterceptEvent::Dispatched(dispatch) => {
                log::debug!(
                    "-> {} {} (auth={}, body={}B)",
                    dispatch.method,
                    dispatch.url,
                    dispatch.has_auth,
                    dispatch.body_size
                );
            }
            InterceptEvent::Responded(post) => {
                log::debug!(
                    "<- {} {} -> {} ({:.2}s)",
                    post.method,
                    post.url,
                    post.status,
                    post.latency.as_secs_f64()
                );
            }
            InterceptEvent::Redirected(redirect) => {
                log::info!("redirect #{} {} -> {}", redirect.hop, redirect.from, redirect.to);
            }
            InterceptEvent::Aborted(abort) => {
                log::warn!("aborted {} -> {}", abort.url, abort.reason);
            }
        }
    }
}

/// Metrics handler that feeds the metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: MetricsCollector,
}

impl MetricsHandler {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &InterceptEvent) {
        match event {
            InterceptEvent::Responded(post) => {
                self.metrics
                    .record_response(post.url.host_str().unwrap_or(""), post.status, post.latency);
            }
            InterceptEvent::Redirected(redirect) => {
                self.metrics.record_redirect(redirect.from.host_str().unwrap_or(""));
            }
            InterceptEvent::Resolution(res) => {
                self.metrics.record_resolution(res.target.is_some());
            }
            InterceptEvent::Aborted(abort) => {
                let host = Url::parse(&abort.url)
                    .ok()
                    .and_then(|url| url.host_str().map(str::to_string))
                    .unwrap_or_default();
                self.metrics.record_abort(&host);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &InterceptEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.dispatch(InterceptEvent::Aborted(AbortEvent {
            url: "https://example.com/".into(),
            reason: "no response".into(),
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }

    #[test]
    fn metrics_handler_counts_aborts_per_host() {
        let metrics = MetricsCollector::new();
        let handler = MetricsHandler::new(metrics.clone());
        handler.handle(&InterceptEvent::Aborted(AbortEvent {
            url: "https://example.com/a".into(),
            reason: "no response".into(),
            timestamp: Utc::now(),
        }));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.global.aborts, 1);
        let host = snapshot.hosts.iter().find(|h| h.host == "example.com").unwrap();
        assert_eq!(host.aborts, 1);
    }
}
