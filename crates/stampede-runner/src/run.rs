// Run orchestration: wire up shared state, drive the plan, analyze the
// outcome.
//
// The target must answer a pre-run health check before any load starts;
// an unreachable target is a setup error, not a test result.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use stampede_client::TargetApi;
use stampede_core::{
    analyze, AnalysisInput, CoreError, RunMetrics, RunReport, RunState, SpikeMonitor,
};

use crate::config::RunConfig;
use crate::scenarios::ScenarioCtx;
use crate::scheduler;

/// Executes one configured load-test run against a target
pub struct Runner {
    api: Arc<dyn TargetApi>,
    config: Arc<RunConfig>,
}

impl Runner {
    pub fn new(api: Arc<dyn TargetApi>, config: RunConfig) -> Result<Self> {
        config
            .plan
            .validate()
            .context("invalid stage plan")?;
        for (name, p) in [
            ("detail_probability", config.detail_probability),
            ("like_probability", config.like_probability),
            ("user_directory_probability", config.user_directory_probability),
            ("signup_probability", config.signup_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CoreError::invalid_config(format!(
                    "{name} must be within 0.0..=1.0, got {p}"
                ))
                .into());
            }
        }
        Ok(Runner {
            api,
            config: Arc::new(config),
        })
    }

    pub async fn execute(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let started = Instant::now();

        let health = self
            .api
            .health()
            .await
            .context("target failed pre-run health check")?;
        tracing::info!(
            profile = %self.config.profile,
            status = %health.value.status,
            max_target = self.config.plan.max_target(),
            total_secs = self.config.plan.total_duration().as_secs_f64(),
            "starting run"
        );

        let ctx = ScenarioCtx {
            api: self.api.clone(),
            state: Arc::new(RunState::new()),
            metrics: Arc::new(RunMetrics::new()),
            spike: Arc::new(SpikeMonitor::new(self.config.spike.clone())),
            config: self.config.clone(),
            started,
        };

        if !self.config.plan.is_empty() {
            scheduler::drive(ctx.clone()).await;
        }

        let duration_secs = started.elapsed().as_secs_f64();
        let snapshot = ctx.metrics.snapshot();
        let input = Self::assemble_input(&ctx, duration_secs / 60.0);
        let verdict = analyze(&input, &self.config.analysis, &self.config.criteria);

        tracing::info!(
            status = %verdict.status,
            passed = verdict.passed,
            requests = snapshot.total_requests,
            failure_rate = snapshot.failure_rate,
            "run complete"
        );

        Ok(RunReport {
            profile: self.config.profile.clone(),
            started_at,
            duration_secs,
            verdict,
            input,
            metrics: snapshot,
        })
    }

    /// Reduce the raw registers and run state into the analysis input
    fn assemble_input(ctx: &ScenarioCtx, elapsed_minutes: f64) -> AnalysisInput {
        let snapshot = ctx.metrics.snapshot();
        let baseline = ctx.state.baseline();

        let memory_growth_mb = match (snapshot.memory_now_mb, baseline.memory_mb) {
            (Some(now), Some(base)) => Some(now - base),
            _ => None,
        };

        // Degradation compares the last per-minute checkpoint against the
        // first observed response time.
        let degradation_ratio = match (ctx.state.checkpoints().last(), baseline.response_ms) {
            (Some((_, checkpoint)), Some(base)) if base > 0.0 => {
                checkpoint.response_ms.map(|last| last / base)
            }
            _ => None,
        };

        AnalysisInput {
            total_requests: snapshot.total_requests,
            failure_rate: snapshot.failure_rate,
            latency: snapshot.latency,
            integrity_rate: snapshot.integrity_rate,
            recovery: snapshot.recovery,
            memory_growth_mb,
            degradation_ratio,
            elapsed_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTarget;
    use std::time::Duration;
    use stampede_core::{Stage, StagePlan, SystemStatus};

    fn short_plan() -> StagePlan {
        StagePlan {
            stages: vec![Stage::hold(Duration::from_millis(100), 2)],
        }
    }

    fn config_with(plan: StagePlan) -> RunConfig {
        RunConfig {
            profile: "test".to_string(),
            plan,
            seed: Some(1),
            tick: Duration::from_millis(10),
            think_time: Duration::from_millis(1),
            ..RunConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_plan_yields_empty_report() {
        let runner = Runner::new(
            Arc::new(FakeTarget::new()),
            config_with(StagePlan::default()),
        )
        .unwrap();
        let report = runner.execute().await.unwrap();
        assert_eq!(report.metrics.total_requests, 0);
        assert_eq!(report.verdict.status, SystemStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_before_load() {
        let runner = Runner::new(
            Arc::new(FakeTarget::new().with_all_requests_failing()),
            config_with(short_plan()),
        )
        .unwrap();
        let err = runner.execute().await.unwrap_err();
        assert!(err.to_string().contains("pre-run health check"));
    }

    #[tokio::test]
    async fn test_invalid_plan_rejected_at_construction() {
        let plan = StagePlan {
            stages: vec![Stage::hold(Duration::from_secs(0), 5)],
        };
        assert!(Runner::new(Arc::new(FakeTarget::new()), config_with(plan)).is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_probability_rejected() {
        let config = RunConfig {
            detail_probability: 1.5,
            ..config_with(short_plan())
        };
        assert!(Runner::new(Arc::new(FakeTarget::new()), config).is_err());
    }

    #[tokio::test]
    async fn test_healthy_run_produces_healthy_report() {
        let fake = FakeTarget::new().with_latency(Duration::from_micros(200));
        let runner = Runner::new(Arc::new(fake), config_with(short_plan())).unwrap();
        let report = runner.execute().await.unwrap();

        assert!(report.metrics.total_requests > 0);
        assert_eq!(report.verdict.status, SystemStatus::Healthy);
        assert!(report.verdict.passed);
    }
}
