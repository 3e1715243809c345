// Post-run analysis: severity classification, qualitative diagnosis,
// recommendations, and the pass/fail verdict.
//
// Decision: every threshold here is configurable data with tuned defaults.
// The constants encode policy, not mechanism, so profiles and config files
// may override any of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::{MetricsSnapshot, TrendSummary};

/// System status, ordered by severity. Worst matching tier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Healthy,
    Warning,
    Slow,
    Degraded,
    Critical,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SystemStatus::Healthy => "HEALTHY",
            SystemStatus::Warning => "WARNING",
            SystemStatus::Slow => "SLOW",
            SystemStatus::Degraded => "DEGRADED",
            SystemStatus::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Memory-growth verdict, normalized to MB per hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    Stable,
    Moderate,
    LeakSuspected,
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryTier::Stable => "stable",
            MemoryTier::Moderate => "moderate growth",
            MemoryTier::LeakSuspected => "leak suspected",
        };
        f.write_str(s)
    }
}

/// Tiers for the overall status classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub warning_failure_rate: f64,
    pub degraded_failure_rate: f64,
    pub critical_failure_rate: f64,
    pub warning_p95_ms: f64,
    pub slow_p95_ms: f64,
    pub degraded_p95_ms: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            warning_failure_rate: 0.01,
            degraded_failure_rate: 0.10,
            critical_failure_rate: 0.25,
            warning_p95_ms: 1_000.0,
            slow_p95_ms: 2_000.0,
            degraded_p95_ms: 5_000.0,
        }
    }
}

/// Tiers for the secondary metrics feeding diagnosis and recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryThresholds {
    pub integrity_warning_below: f64,
    pub integrity_critical_below: f64,
    pub recovery_warning_secs: f64,
    pub recovery_critical_secs: f64,
    pub degradation_warning_ratio: f64,
    pub degradation_critical_ratio: f64,
    pub leak_moderate_mb_per_hour: f64,
    pub leak_suspect_mb_per_hour: f64,
    pub error_volume_alert_rate: f64,
    pub recovery_alert_secs: f64,
    pub tail_latency_alert_ms: f64,
}

impl Default for SecondaryThresholds {
    fn default() -> Self {
        SecondaryThresholds {
            integrity_warning_below: 0.99,
            integrity_critical_below: 0.95,
            recovery_warning_secs: 5.0,
            recovery_critical_secs: 15.0,
            degradation_warning_ratio: 1.5,
            degradation_critical_ratio: 3.0,
            leak_moderate_mb_per_hour: 10.0,
            leak_suspect_mb_per_hour: 50.0,
            error_volume_alert_rate: 0.05,
            recovery_alert_secs: 10.0,
            tail_latency_alert_ms: 2_000.0,
        }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub status: StatusThresholds,
    pub secondary: SecondaryThresholds,
}

/// Pass/fail criteria, distinct per load profile. Unset fields are not
/// checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PassCriteria {
    pub max_failure_rate: Option<f64>,
    pub max_p95_ms: Option<f64>,
    pub min_integrity_rate: Option<f64>,
    pub max_recovery_secs: Option<f64>,
    pub max_leak_mb_per_hour: Option<f64>,
}

/// Final register values plus run-state derived figures handed to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub total_requests: u64,
    /// Overall failure rate in `0.0..=1.0`
    pub failure_rate: f64,
    pub latency: Option<TrendSummary>,
    pub integrity_rate: Option<f64>,
    pub recovery: Option<TrendSummary>,
    /// Last memory sample minus the baseline sample, in MB
    pub memory_growth_mb: Option<f64>,
    /// Last checkpoint response time over the baseline response time
    pub degradation_ratio: Option<f64>,
    pub elapsed_minutes: f64,
}

/// The engine's structured output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: SystemStatus,
    pub passed: bool,
    pub diagnosis: String,
    pub recommendations: Vec<String>,
    pub memory_tier: Option<MemoryTier>,
    pub leak_mb_per_hour: Option<f64>,
}

/// Fixed advice strings appended when specific thresholds are breached
pub mod recommendations {
    pub const NO_ACTION: &str =
        "System is performing within expected parameters; no action needed.";
    pub const ERROR_VOLUME: &str = "High error volume: add a circuit breaker and retry with \
        backoff on the client side, and inspect server error logs.";
    pub const RECOVERY_DELAY: &str =
        "Slow recovery after load spikes: provision warm capacity or tune scale-out triggers.";
    pub const INTEGRITY: &str =
        "Data integrity failures detected: audit the write path for lost or partial updates.";
    pub const TAIL_LATENCY: &str =
        "High tail latency: add caching for hot reads and review slow queries.";
}

/// Classify overall status from failure rate and high-percentile latency.
/// Worst matching tier wins.
pub fn classify_status(input: &AnalysisInput, thresholds: &StatusThresholds) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    let p95 = input.latency.map(|l| l.p95).unwrap_or(0.0);

    if input.failure_rate > thresholds.warning_failure_rate || p95 > thresholds.warning_p95_ms {
        status = status.max(SystemStatus::Warning);
    }
    if p95 > thresholds.slow_p95_ms {
        status = status.max(SystemStatus::Slow);
    }
    if input.failure_rate > thresholds.degraded_failure_rate || p95 > thresholds.degraded_p95_ms {
        status = status.max(SystemStatus::Degraded);
    }
    if input.failure_rate > thresholds.critical_failure_rate {
        status = status.max(SystemStatus::Critical);
    }
    status
}

/// Memory-growth tier from growth-per-hour normalization
pub fn memory_tier(growth_mb: f64, elapsed_minutes: f64, t: &SecondaryThresholds) -> (MemoryTier, f64) {
    let per_hour = if elapsed_minutes > 0.0 {
        growth_mb / elapsed_minutes * 60.0
    } else {
        0.0
    };
    let tier = if per_hour > t.leak_suspect_mb_per_hour {
        MemoryTier::LeakSuspected
    } else if per_hour >= t.leak_moderate_mb_per_hour {
        MemoryTier::Moderate
    } else {
        MemoryTier::Stable
    };
    (tier, per_hour)
}

/// Run the full analysis: status, diagnosis, recommendations, pass/fail.
pub fn analyze(input: &AnalysisInput, config: &AnalysisConfig, criteria: &PassCriteria) -> Verdict {
    let status = classify_status(input, &config.status);
    let s = &config.secondary;

    let mut diagnosis = vec![format!(
        "Overall status {}: {} requests, {:.2}% failed.",
        status,
        input.total_requests,
        input.failure_rate * 100.0
    )];

    if let Some(rate) = input.integrity_rate {
        if rate >= s.integrity_warning_below {
            diagnosis.push(format!("Data integrity held at {:.1}%.", rate * 100.0));
        } else if rate >= s.integrity_critical_below {
            diagnosis.push(format!(
                "Data integrity slipped to {:.1}%; some round-trips did not match.",
                rate * 100.0
            ));
        } else {
            diagnosis.push(format!(
                "Data integrity is critical at {:.1}%; the target is losing or corrupting writes.",
                rate * 100.0
            ));
        }
    }

    if let Some(recovery) = input.recovery {
        if recovery.avg < s.recovery_warning_secs {
            diagnosis.push(format!(
                "Spike recovery averaged {:.1}s; the target absorbs spikes well.",
                recovery.avg
            ));
        } else if recovery.avg < s.recovery_critical_secs {
            diagnosis.push(format!(
                "Spike recovery averaged {:.1}s; the target is slow to shed spike load.",
                recovery.avg
            ));
        } else {
            diagnosis.push(format!(
                "Spike recovery averaged {:.1}s; the target struggles to recover from spikes.",
                recovery.avg
            ));
        }
    }

    let (tier, leak_per_hour) = match input.memory_growth_mb {
        Some(growth) => {
            let (tier, per_hour) = memory_tier(growth, input.elapsed_minutes, s);
            match tier {
                MemoryTier::Stable => diagnosis.push(format!(
                    "Memory usage is stable ({:+.1} MB/h).",
                    per_hour
                )),
                MemoryTier::Moderate => diagnosis.push(format!(
                    "Memory grew moderately ({:+.1} MB/h); worth watching over longer runs.",
                    per_hour
                )),
                MemoryTier::LeakSuspected => diagnosis.push(format!(
                    "Memory grew {:+.1} MB/h; a leak is suspected.",
                    per_hour
                )),
            }
            (Some(tier), Some(per_hour))
        }
        None => (None, None),
    };

    if let Some(ratio) = input.degradation_ratio {
        if ratio < s.degradation_warning_ratio {
            diagnosis.push(format!(
                "Response times ended at {:.2}x the baseline; no sustained degradation.",
                ratio
            ));
        } else if ratio < s.degradation_critical_ratio {
            diagnosis.push(format!(
                "Response times degraded to {:.2}x the baseline over the run.",
                ratio
            ));
        } else {
            diagnosis.push(format!(
                "Response times degraded severely to {:.2}x the baseline.",
                ratio
            ));
        }
    }

    let mut recs = Vec::new();
    if input.failure_rate > s.error_volume_alert_rate {
        recs.push(recommendations::ERROR_VOLUME.to_string());
    }
    if input
        .recovery
        .map(|r| r.avg > s.recovery_alert_secs)
        .unwrap_or(false)
    {
        recs.push(recommendations::RECOVERY_DELAY.to_string());
    }
    if input
        .integrity_rate
        .map(|r| r < s.integrity_warning_below)
        .unwrap_or(false)
    {
        recs.push(recommendations::INTEGRITY.to_string());
    }
    if input
        .latency
        .map(|l| l.p99 > s.tail_latency_alert_ms)
        .unwrap_or(false)
    {
        recs.push(recommendations::TAIL_LATENCY.to_string());
    }
    if recs.is_empty() {
        recs.push(recommendations::NO_ACTION.to_string());
    }

    let passed = check_criteria(input, criteria, leak_per_hour);

    Verdict {
        status,
        passed,
        diagnosis: diagnosis.join(" "),
        recommendations: recs,
        memory_tier: tier,
        leak_mb_per_hour: leak_per_hour,
    }
}

fn check_criteria(input: &AnalysisInput, criteria: &PassCriteria, leak_per_hour: Option<f64>) -> bool {
    if let Some(max) = criteria.max_failure_rate {
        if input.failure_rate > max {
            return false;
        }
    }
    if let (Some(max), Some(latency)) = (criteria.max_p95_ms, input.latency) {
        if latency.p95 > max {
            return false;
        }
    }
    if let (Some(min), Some(rate)) = (criteria.min_integrity_rate, input.integrity_rate) {
        if rate < min {
            return false;
        }
    }
    if let (Some(max), Some(recovery)) = (criteria.max_recovery_secs, input.recovery) {
        if recovery.avg > max {
            return false;
        }
    }
    if let (Some(max), Some(per_hour)) = (criteria.max_leak_mb_per_hour, leak_per_hour) {
        if per_hour > max {
            return false;
        }
    }
    true
}

/// Full structured report for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub verdict: Verdict,
    pub input: AnalysisInput,
    pub metrics: MetricsSnapshot,
}
