//! Metrics collection utilities.
//!
//! Provides aggregated global and per-host statistics with latency
//! percentiles for observability.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Aggregated metrics across all hosts.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub responses: u64,
    pub error_responses: u64,
    pub aborts: u64,
    pub redirects: u64,
    pub resolutions: u64,
    pub failed_resolutions: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            responses: 0,
            error_responses: 0,
            aborts: 0,
            redirects: 0,
            resolutions: 0,
            failed_resolutions: 0,
            average_latency: None,
            p95_latency: None,
        }
    }
}

/// Host-scoped metrics snapshot.
#[derive(Debug, Clone)]
pub struct HostStats {
    pub host: String,
    pub responses: u64,
    pub error_responses: u64,
    pub aborts: u64,
    pub redirects: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
    pub last_status: Option<u16>,
}

impl HostStats {
    fn from_accumulator(host: &str, acc: &HostAccumulator) -> Self {
        let (avg, p95) = latency_stats(acc.latencies.iter().copied());
        Self {
            host: host.to_string(),
            responses: acc.responses,
            error_responses: acc.error_responses,
            aborts: acc.aborts,
            redirects: acc.redirects,
            average_latency: avg,
            p95_latency: p95,
            last_status: acc.last_status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    pub hosts: Vec<HostStats>,
}

#[derive(Debug)]
struct HostAccumulator {
    responses: u64,
    error_responses: u64,
    aborts: u64,
    redirects: u64,
    latencies: VecDeque<Duration>,
    max_window: usize,
    last_status: Option<u16>,
}

impl HostAccumulator {
    fn new(max_window: usize) -> Self {
        Self {
            responses: 0,
            error_responses: 0,
            aborts: 0,
            redirects: 0,
            latencies: VecDeque::with_capacity(max_window),
            max_window,
            last_status: None,
        }
    }

    fn record(&mut self, status: u16, latency: Duration) {
        self.responses += 1;
        self.last_status = Some(status);
        if status >= 400 {
            self.error_responses += 1;
        }

        if self.latencies.len() == self.max_window {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }
}

fn latency_stats(samples: impl Iterator<Item = Duration>) -> (Option<Duration>, Option<Duration>) {
    let mut samples: Vec<_> = samples.collect();
    if samples.is_empty() {
        return (None, None);
    }
    samples.sort_unstable();
    let avg = samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / samples.len() as f64;
    let p95_index = ((samples.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
    (Some(Duration::from_secs_f64(avg)), Some(samples[p95_index]))
}

#[derive(Debug)]
struct MetricsState {
    global: GlobalStats,
    max_window: usize,
    hosts: HashMap<String, HostAccumulator>,
}

impl MetricsState {
    fn new(max_window: usize) -> Self {
        Self {
            global: GlobalStats::default(),
            max_window,
            hosts: HashMap::new(),
        }
    }

    fn accumulator_mut(&mut self, host: &str) -> &mut HostAccumulator {
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| HostAccumulator::new(self.max_window))
    }
}

/// Thread-safe metrics collector fed by [`super::events::MetricsHandler`].
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(128))),
        }
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(window.max(16)))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Counters stay usable even if a recording thread panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_response(&self, host: &str, status: u16, latency: Duration) {
        let mut guard = self.lock();
        guard.global.responses += 1;
        if status >= 400 {
            guard.global.error_responses += 1;
        }

        if let Some(avg) = guard.global.average_latency {
            let blended = (avg.as_secs_f64() * 0.9) + (latency.as_secs_f64() * 0.1);
            guard.global.average_latency = Some(Duration::from_secs_f64(blended));
        } else {
            guard.global.average_latency = Some(latency);
        }

        guard.accumulator_mut(host).record(status, latency);

        let (_, p95) = latency_stats(
            guard
                .hosts
                .values()
                .flat_map(|acc| acc.latencies.iter().copied()),
        );
        guard.global.p95_latency = p95;
    }

    pub fn record_redirect(&self, host: &str) {
        let mut guard = self.lock();
        guard.global.redirects += 1;
        guard.accumulator_mut(host).redirects += 1;
    }

    pub fn record_abort(&self, host: &str) {
        let mut guard = self.lock();
        guard.global.aborts += 1;
        guard.accumulator_mut(host).aborts += 1;
    }

    pub fn record_resolution(&self, success: bool) {
        let mut guard = self.lock();
        guard.global.resolutions += 1;
        if !success {
            guard.global.failed_resolutions += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.lock();
        let hosts = guard
            .hosts
            .iter()
            .map(|(host, acc)| HostStats::from_accumulator(host, acc))
            .collect();
        MetricsSnapshot {
            global: guard.global.clone(),
            hosts,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn records_responses_redirects_and_aborts() {
        let metrics = MetricsCollector::new();
        metrics.record_response("example.com", 200, Duration::from_millis(150));
        metrics.record_response("example.com", 404, Duration::from_millis(800));
        metrics.record_redirect("example.com");
        metrics.record_abort("example.com");

        let snapshot = metrics.snapshot();
        let host = snapshot
            .hosts
            .iter()
            .find(|h| h.host == "example.com")
            .unwrap();
        assert_eq!(host.responses, 2);
        assert_eq!(host.error_responses, 1);
        assert_eq!(host.redirects, 1);
        assert_eq!(host.aborts, 1);
        assert_eq!(host.last_status, Some(404));
        assert_eq!(host.p95_latency, Some(Duration::from_millis(800)));
    }

    #[test]
    fn counts_failed_resolutions() {
        let metrics = MetricsCollector::new();
        metrics.record_resolution(true);
        metrics.record_resolution(false);
        let global = metrics.snapshot().global;
        assert_eq!(global.resolutions, 2);
        assert_eq!(global.failed_resolutions, 1);
    }
}
