// End-to-end runs against the in-memory fake target.

use std::sync::Arc;
use std::time::Duration;

use stampede_core::{recommendations, PassCriteria, Stage, StagePlan, SystemStatus};
use stampede_runner::{FakeTarget, RunConfig, Runner};

fn config(plan: StagePlan) -> RunConfig {
    RunConfig {
        profile: "integration".to_string(),
        plan,
        criteria: PassCriteria {
            max_failure_rate: Some(0.05),
            ..PassCriteria::default()
        },
        seed: Some(4242),
        tick: Duration::from_millis(10),
        think_time: Duration::from_millis(1),
        ..RunConfig::default()
    }
}

fn ramp_and_hold(millis: u64, target: usize) -> StagePlan {
    StagePlan {
        stages: vec![
            Stage::ramp(Duration::from_millis(millis / 2), target),
            Stage::hold(Duration::from_millis(millis / 2), target),
        ],
    }
}

#[tokio::test]
async fn test_healthy_run_passes_with_no_action() {
    let fake = FakeTarget::new().with_latency(Duration::from_micros(500));
    let runner = Runner::new(Arc::new(fake), config(ramp_and_hold(200, 3))).unwrap();

    let report = runner.execute().await.unwrap();

    assert!(report.metrics.total_requests > 0);
    assert_eq!(report.metrics.failed_requests, 0);
    assert_eq!(report.verdict.status, SystemStatus::Healthy);
    assert!(report.verdict.passed);
    assert_eq!(report.verdict.recommendations, vec![recommendations::NO_ACTION]);
}

#[tokio::test]
async fn test_failing_target_is_critical_with_error_volume_advice() {
    let fake = FakeTarget::new().with_latency(Duration::from_micros(500));
    let handle = fake.handle();
    let runner = Runner::new(Arc::new(fake), config(ramp_and_hold(200, 3))).unwrap();

    // Let the pre-run health check and a few requests through, then fail
    // everything for the rest of the run.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.set_failing(true);
    });

    let report = runner.execute().await.unwrap();

    assert!(report.metrics.failed_requests > 0);
    assert_eq!(report.verdict.status, SystemStatus::Critical);
    assert!(!report.verdict.passed);
    assert!(report
        .verdict
        .recommendations
        .iter()
        .any(|r| r == recommendations::ERROR_VOLUME));
}

#[tokio::test]
async fn test_live_concurrency_stays_within_plan() {
    let fake = FakeTarget::new().with_latency(Duration::from_micros(200));
    let handle = fake.handle();
    let runner = Runner::new(Arc::new(fake), config(ramp_and_hold(200, 5))).unwrap();

    runner.execute().await.unwrap();

    // One request in flight per client at most, so the peak in-flight count
    // bounds live concurrency.
    assert!(handle.peak_in_flight() <= 5);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let fake = FakeTarget::new().with_latency(Duration::from_micros(500));
    let runner = Runner::new(Arc::new(fake), config(ramp_and_hold(100, 2))).unwrap();

    let report = runner.execute().await.unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"profile\":\"integration\""));
    assert!(json.contains("\"status\""));
}
