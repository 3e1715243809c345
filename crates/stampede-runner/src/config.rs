// Run configuration: everything a single run needs beyond the target URL.
//
// Stage plans, thresholds, and tuning knobs are passed in from profiles or
// config files, never hard-coded inside the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use stampede_core::{AnalysisConfig, PassCriteria, SpikeConfig, StagePlan};

/// Configuration for one load-test run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Profile name carried into the report
    pub profile: String,
    pub plan: StagePlan,
    pub criteria: PassCriteria,
    pub analysis: AnalysisConfig,
    pub spike: SpikeConfig,
    /// Base seed for the per-client RNGs; fix it to reproduce a scenario mix
    pub seed: Option<u64>,
    /// Scheduler tick; live concurrency tracks C(t) within one tick of error
    pub tick: Duration,
    /// Pause between scenario iterations of one simulated client
    pub think_time: Duration,
    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Duration,
    /// A recovery probe under this latency counts as responsive
    pub probe_responsive_ms: f64,
    /// Per-minute memory growth beyond this increments the leak counter
    pub leak_alert_mb_per_min: f64,
    /// Chance that a browse drills into a post's detail view
    pub detail_probability: f64,
    /// Chance that a viewed post also gets liked
    pub like_probability: f64,
    /// Chance that a browse visits the user directory instead of posts
    pub user_directory_probability: f64,
    /// Chance that a user-directory visit registers a new account
    pub signup_probability: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            profile: "custom".to_string(),
            plan: StagePlan::default(),
            criteria: PassCriteria::default(),
            analysis: AnalysisConfig::default(),
            spike: SpikeConfig::default(),
            seed: None,
            tick: Duration::from_millis(250),
            think_time: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
            probe_responsive_ms: 1_000.0,
            leak_alert_mb_per_min: 1.0,
            detail_probability: 0.6,
            like_probability: 0.3,
            user_directory_probability: 0.15,
            signup_probability: 0.1,
        }
    }
}
