//! Cross-cutting services module
//!
//! Observability for the interception pipeline: structured events and the
//! metrics they feed.

pub mod events;
pub mod metrics;

// Re-export commonly used types
pub use events::{
    AbortEvent, DispatchEvent, EventDispatcher, EventHandler, InterceptEvent, InterceptedEvent,
    LoggingHandler, MetricsHandler, RedirectEvent, ResolutionEvent, ResponseEvent,
};
pub use metrics::{GlobalStats, HostStats, MetricsCollector, MetricsSnapshot};
