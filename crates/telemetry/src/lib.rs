//! Request-level metrics accumulation and rendering for the proxy.
//!
//! One [`Metrics`] accumulator is shared process-wide; [`Metrics::snapshot`]
//! and [`render_prometheus`] separate accumulation from presentation, feeding
//! both `GET /metrics` (JSON) and `GET /metrics/prometheus` (text).

mod render;

pub use render::render_prometheus;

use serde::Serialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// Process-wide counters. All fields are independently-updated atomics; no
/// lock is needed because each counter only ever moves forward.
pub struct Metrics {
    started_at: Instant,
    requests_total: AtomicU64,
    requests_successful: AtomicU64,
    requests_errors: AtomicU64,
    requests_streaming: AtomicU64,
    requests_tool_calls: AtomicU64,
    latency_total_ms: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    rate_limited: AtomicU64,
    circuit_breaker_trips: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            requests_total: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_errors: AtomicU64::new(0),
            requests_streaming: AtomicU64::new(0),
            requests_tool_calls: AtomicU64::new(0),
            latency_total_ms: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            circuit_breaker_trips: AtomicU64::new(0),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, streaming: bool, tool_calls: usize, latency_ms: u64, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.latency_total_ms.fetch_add(latency_ms, Ordering::Relaxed);

        if success {
            self.requests_successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_errors.fetch_add(1, Ordering::Relaxed);
        }

        if streaming {
            self.requests_streaming.fetch_add(1, Ordering::Relaxed);
        }

        if tool_calls > 0 {
            self.requests_tool_calls.fetch_add(tool_calls as u64, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_circuit_breaker_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests_total = self.requests_total.load(Ordering::Relaxed);
        let latency_total_ms = self.latency_total_ms.load(Ordering::Relaxed);
        let uptime_seconds = self.started_at.elapsed().as_secs_f64();

        let latency_avg_ms = if requests_total > 0 {
            latency_total_ms as f64 / requests_total as f64
        } else {
            0.0
        };

        let requests_per_second = if uptime_seconds > 0.0 {
            requests_total as f64 / uptime_seconds
        } else {
            0.0
        };

        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            cache_hits as f64 / cache_total as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            requests_total,
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_errors: self.requests_errors.load(Ordering::Relaxed),
            requests_streaming: self.requests_streaming.load(Ordering::Relaxed),
            requests_tool_calls: self.requests_tool_calls.load(Ordering::Relaxed),
            latency_total_ms,
            latency_avg_ms,
            uptime_seconds,
            requests_per_second,
            cache_hits,
            cache_misses,
            cache_hit_rate,
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time rendering of [`Metrics`], suitable for JSON serialization.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_successful: u64,
    pub requests_errors: u64,
    pub requests_streaming: u64,
    pub requests_tool_calls: u64,
    pub latency_total_ms: u64,
    pub latency_avg_ms: f64,
    pub uptime_seconds: f64,
    pub requests_per_second: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub rate_limited: u64,
    pub circuit_breaker_trips: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_are_zero_before_any_request() {
        let metrics = Metrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 0);
        assert_eq!(snapshot.latency_avg_ms, 0.0);
    }

    #[test]
    fn records_accumulate() {
        let metrics = Metrics::new();
        metrics.record_request(false, 0, 100, true);
        metrics.record_request(true, 2, 200, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.requests_successful, 1);
        assert_eq!(snapshot.requests_errors, 1);
        assert_eq!(snapshot.requests_streaming, 1);
        assert_eq!(snapshot.requests_tool_calls, 2);
        assert_eq!(snapshot.latency_avg_ms, 150.0);
    }
}
