// Metric registers fed by scenario code during a run.
//
// Registers are append-only while the run is live: scenarios only write
// observations, and the one-shot reduction into summaries happens at report
// time. Counter/Gauge/Rate sit on atomics so arbitrarily many simulated
// clients can write without coordination; Trend appends under a short mutex.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Monotonic running total of discrete events
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Last-written point-in-time value
#[derive(Debug, Default)]
pub struct Gauge {
    bits: AtomicU64,
    written: AtomicBool,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        self.written.store(true, Ordering::Release);
    }

    /// Returns `None` until the first write
    pub fn value(&self) -> Option<f64> {
        if self.written.load(Ordering::Acquire) {
            Some(f64::from_bits(self.bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }
}

/// Ratio of successful observations to total observations
#[derive(Debug, Default)]
pub struct Rate {
    hits: AtomicU64,
    total: AtomicU64,
}

impl Rate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, success: bool) {
        if success {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observations(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Success ratio in `0.0..=1.0`, or `None` before any observation
    pub fn value(&self) -> Option<f64> {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return None;
        }
        Some(self.hits.load(Ordering::Relaxed) as f64 / total as f64)
    }
}

/// Distribution of numeric samples, reduced once at report time
#[derive(Debug, Default)]
pub struct Trend {
    samples: Mutex<Vec<f64>>,
}

impl Trend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sample: f64) {
        self.samples.lock().expect("trend lock poisoned").push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("trend lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reduce all samples into a summary. `None` when nothing was recorded.
    pub fn summarize(&self) -> Option<TrendSummary> {
        let samples = self.samples.lock().expect("trend lock poisoned");
        TrendSummary::from_samples(&samples)
    }
}

/// Reduced view of a Trend register
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl TrendSummary {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let sum: f64 = sorted.iter().sum();
        Some(TrendSummary {
            count: sorted.len(),
            avg: sum / sorted.len() as f64,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        })
    }
}

/// Nearest-rank percentile over pre-sorted samples
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Every named register one run feeds.
///
/// Shared by reference across all simulated clients; raw HTTP aggregates
/// (request/failure/byte counters, latency trend) live here alongside the
/// derived registers the scenarios write.
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Total requests issued
    pub requests: Counter,
    /// Requests that failed (non-2xx, transport error, or timeout)
    pub failures: Counter,
    /// Response bytes received
    pub bytes: Counter,
    /// Per-request latency in milliseconds
    pub request_latency: Trend,
    /// Request success ratio
    pub request_success: Rate,
    /// Data-integrity round-trip checks
    pub integrity: Rate,
    /// Spike recovery times in seconds
    pub recovery_time: Trend,
    /// Target heap usage samples in MB
    pub memory_mb: Trend,
    /// Most recent heap usage in MB
    pub memory_now_mb: Gauge,
    /// Most recent response time in milliseconds
    pub last_response_ms: Gauge,
    /// Times the per-minute memory growth threshold was exceeded
    pub leak_suspicions: Counter,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request
    pub fn record_success(&self, latency_ms: f64, bytes: u64) {
        self.requests.incr();
        self.bytes.add(bytes);
        self.request_latency.record(latency_ms);
        self.request_success.observe(true);
        self.last_response_ms.set(latency_ms);
    }

    /// Record a failed request (never throws; failures are data here)
    pub fn record_failure(&self) {
        self.requests.incr();
        self.failures.incr();
        self.request_success.observe(false);
    }

    /// Overall failure rate in `0.0..=1.0`
    pub fn failure_rate(&self) -> f64 {
        let total = self.requests.value();
        if total == 0 {
            return 0.0;
        }
        self.failures.value() as f64 / total as f64
    }

    /// One-shot reduction of every register for the report
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.requests.value(),
            failed_requests: self.failures.value(),
            bytes_received: self.bytes.value(),
            failure_rate: self.failure_rate(),
            latency: self.request_latency.summarize(),
            integrity_rate: self.integrity.value(),
            integrity_checks: self.integrity.observations(),
            recovery: self.recovery_time.summarize(),
            memory: self.memory_mb.summarize(),
            memory_now_mb: self.memory_now_mb.value(),
            last_response_ms: self.last_response_ms.value(),
            leak_suspicions: self.leak_suspicions.value(),
        }
    }
}

/// Machine-readable dump of all reduced register values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub bytes_received: u64,
    pub failure_rate: f64,
    pub latency: Option<TrendSummary>,
    pub integrity_rate: Option<f64>,
    pub integrity_checks: u64,
    pub recovery: Option<TrendSummary>,
    pub memory: Option<TrendSummary>,
    pub memory_now_mb: Option<f64>,
    pub last_response_ms: Option<f64>,
    pub leak_suspicions: u64,
}
