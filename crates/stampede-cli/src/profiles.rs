// Built-in load profiles.
//
// Each profile is a complete RunConfig: a stage plan plus the pass/fail
// criteria appropriate for that kind of run. A config file can still
// override any field afterwards.

use anyhow::{bail, Result};
use std::time::Duration;

use stampede_core::{PassCriteria, SpikeConfig, Stage, StagePlan};
use stampede_runner::RunConfig;

pub const NAMES: &[&str] = &["smoke", "load", "stress", "spike", "soak"];

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Build the named profile's configuration
pub fn build(name: &str) -> Result<RunConfig> {
    let (plan, criteria, spike, request_timeout) = match name {
        // Quick correctness pass at trivial concurrency.
        "smoke" => (
            StagePlan {
                stages: vec![
                    Stage::ramp(Duration::from_secs(30), 5),
                    Stage::hold(minutes(1), 5),
                    Stage::ramp(Duration::from_secs(15), 0),
                ],
            },
            PassCriteria {
                max_failure_rate: Some(0.01),
                max_p95_ms: Some(1_000.0),
                min_integrity_rate: Some(0.99),
                ..PassCriteria::default()
            },
            SpikeConfig::default(),
            Duration::from_secs(5),
        ),
        // Sustained expected traffic.
        "load" => (
            StagePlan {
                stages: vec![
                    Stage::ramp(minutes(2), 50),
                    Stage::hold(minutes(5), 50),
                    Stage::ramp(minutes(1), 0),
                ],
            },
            PassCriteria {
                max_failure_rate: Some(0.05),
                max_p95_ms: Some(2_000.0),
                min_integrity_rate: Some(0.99),
                ..PassCriteria::default()
            },
            SpikeConfig::default(),
            Duration::from_secs(10),
        ),
        // Push past expected capacity in steps.
        "stress" => (
            StagePlan {
                stages: vec![
                    Stage::ramp(minutes(2), 100),
                    Stage::hold(minutes(3), 100),
                    Stage::ramp(minutes(2), 200),
                    Stage::hold(minutes(3), 200),
                    Stage::ramp(minutes(1), 0),
                ],
            },
            PassCriteria {
                max_failure_rate: Some(0.10),
                ..PassCriteria::default()
            },
            SpikeConfig {
                high_water: 120,
                ..SpikeConfig::default()
            },
            Duration::from_secs(15),
        ),
        // Two sudden bursts with quiet periods to measure recovery.
        "spike" => (
            StagePlan {
                stages: vec![
                    Stage::hold(minutes(1), 10),
                    Stage::ramp(Duration::from_secs(10), 300),
                    Stage::hold(Duration::from_secs(30), 300),
                    Stage::ramp(Duration::from_secs(10), 10),
                    Stage::hold(minutes(2), 10),
                    Stage::ramp(Duration::from_secs(10), 300),
                    Stage::hold(Duration::from_secs(30), 300),
                    Stage::ramp(Duration::from_secs(10), 10),
                    Stage::hold(minutes(2), 10),
                ],
            },
            PassCriteria {
                max_failure_rate: Some(0.10),
                max_recovery_secs: Some(15.0),
                ..PassCriteria::default()
            },
            SpikeConfig {
                high_water: 100,
                dwell: Duration::from_secs(5),
            },
            Duration::from_secs(15),
        ),
        // Long run at moderate load watching for leaks and drift.
        "soak" => (
            StagePlan {
                stages: vec![
                    Stage::ramp(minutes(2), 30),
                    Stage::hold(minutes(30), 30),
                    Stage::ramp(minutes(1), 0),
                ],
            },
            PassCriteria {
                max_failure_rate: Some(0.02),
                max_leak_mb_per_hour: Some(10.0),
                ..PassCriteria::default()
            },
            SpikeConfig::default(),
            Duration::from_secs(10),
        ),
        other => bail!(
            "unknown profile {other:?}, expected one of {}",
            NAMES.join(", ")
        ),
    };

    Ok(RunConfig {
        profile: name.to_string(),
        plan,
        criteria,
        spike,
        request_timeout,
        ..RunConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_profile_builds_a_valid_plan() {
        for name in NAMES {
            let config = build(name).unwrap();
            assert_eq!(config.profile, *name);
            config.plan.validate().unwrap();
            assert!(!config.plan.is_empty());
        }
    }

    #[test]
    fn test_request_timeouts_vary_by_profile_within_bounds() {
        for name in NAMES {
            let timeout = build(name).unwrap().request_timeout;
            assert!(timeout >= Duration::from_secs(5), "{name} timeout too low");
            assert!(timeout <= Duration::from_secs(15), "{name} timeout too high");
        }
        assert!(build("smoke").unwrap().request_timeout < build("stress").unwrap().request_timeout);
    }

    #[test]
    fn test_unknown_profile_is_an_error() {
        assert!(build("warp").is_err());
    }

    #[test]
    fn test_spike_profile_has_two_bursts_above_high_water() {
        let config = build("spike").unwrap();
        let high_water = config.spike.high_water;
        let bursts = config
            .plan
            .stages
            .iter()
            .filter(|s| matches!(s.ramp, stampede_core::Ramp::Hold) && s.target > high_water)
            .count();
        assert_eq!(bursts, 2);
    }
}
