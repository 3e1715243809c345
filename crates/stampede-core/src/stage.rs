// Stage plans: declarative (duration, target concurrency) sequences.
//
// Decision: ramp vs plateau is an explicit field on Stage rather than being
// inferred from consecutive target values, so a plan reads unambiguously.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreError, Result};

/// How a stage reaches its target concurrency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ramp {
    /// Interpolate linearly from the previous stage's target
    Linear,
    /// Hold the target constant for the whole stage
    Hold,
}

/// One interval of the load profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
    pub ramp: Ramp,
}

impl Stage {
    /// Stage that ramps linearly to `target` over `duration`
    pub fn ramp(duration: Duration, target: usize) -> Self {
        Stage {
            duration,
            target,
            ramp: Ramp::Linear,
        }
    }

    /// Stage that holds `target` constant for `duration`
    pub fn hold(duration: Duration, target: usize) -> Self {
        Stage {
            duration,
            target,
            ramp: Ramp::Hold,
        }
    }
}

/// Ordered sequence of stages; elapsed run time maps onto the active stage
/// via cumulative duration lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagePlan {
    pub stages: Vec<Stage>,
}

impl StagePlan {
    pub fn new(stages: Vec<Stage>) -> Self {
        StagePlan { stages }
    }

    /// An empty plan performs no work and completes immediately; that is not
    /// an error. Zero-duration stages are.
    pub fn validate(&self) -> Result<()> {
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(CoreError::invalid_plan(format!(
                    "stage {} has zero duration",
                    i
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Cumulative duration of all stages
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest target concurrency declared by any stage
    pub fn max_target(&self) -> usize {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target concurrency `C(t)` for elapsed run time `t`.
    ///
    /// Linear stages interpolate from the previous stage's target (0 before
    /// the first stage); hold stages pin their target for the whole interval.
    /// Past the end of the plan the target is 0.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut stage_start = Duration::ZERO;
        let mut prev_target = 0usize;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                return match stage.ramp {
                    Ramp::Hold => stage.target,
                    Ramp::Linear => {
                        let frac = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        let from = prev_target as f64;
                        let to = stage.target as f64;
                        (from + (to - from) * frac).round() as usize
                    }
                };
            }
            stage_start = stage_end;
            prev_target = stage.target;
        }

        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_empty_plan_is_zero_everywhere() {
        let plan = StagePlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.total_duration(), Duration::ZERO);
        assert_eq!(plan.max_target(), 0);
        assert_eq!(plan.target_at(secs(10)), 0);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_linear_ramp_interpolates_from_zero() {
        let plan = StagePlan::new(vec![Stage::ramp(secs(100), 100)]);
        assert_eq!(plan.target_at(secs(0)), 0);
        assert_eq!(plan.target_at(secs(50)), 50);
        assert_eq!(plan.target_at(secs(99)), 99);
    }

    #[test]
    fn test_hold_stage_is_constant() {
        let plan = StagePlan::new(vec![Stage::hold(secs(60), 10)]);
        assert_eq!(plan.target_at(secs(0)), 10);
        assert_eq!(plan.target_at(secs(59)), 10);
    }

    #[test]
    fn test_ramp_then_hold_then_ramp_down() {
        let plan = StagePlan::new(vec![
            Stage::ramp(secs(60), 20),
            Stage::hold(secs(120), 20),
            Stage::ramp(secs(60), 0),
        ]);
        assert_eq!(plan.target_at(secs(30)), 10);
        assert_eq!(plan.target_at(secs(90)), 20);
        assert_eq!(plan.target_at(secs(210)), 10);
        assert_eq!(plan.total_duration(), secs(240));
        assert_eq!(plan.max_target(), 20);
    }

    #[test]
    fn test_target_zero_after_plan_ends() {
        let plan = StagePlan::new(vec![Stage::hold(secs(10), 5)]);
        assert_eq!(plan.target_at(secs(10)), 0);
        assert_eq!(plan.target_at(secs(1000)), 0);
    }

    #[test]
    fn test_zero_duration_stage_rejected() {
        let plan = StagePlan::new(vec![Stage::hold(Duration::ZERO, 5)]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_ramp_down_interpolates_from_previous_target() {
        let plan = StagePlan::new(vec![
            Stage::hold(secs(10), 100),
            Stage::ramp(secs(100), 0),
        ]);
        assert_eq!(plan.target_at(secs(10)), 100);
        assert_eq!(plan.target_at(secs(60)), 50);
    }
}
