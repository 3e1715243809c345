// Scenario library: the scripted user behaviors simulated clients run.
//
// Every scenario is a function of the shared context: it issues one or more
// requests against the target, records outcomes into the metric registers
// and run state, and returns. Request failures are absorbed here and turned
// into observations; one client's failure never aborts another's loop.

use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use stampede_client::{ApiResult, ClientResult, NewPost, NewUser, TargetApi};
use stampede_core::{CreatedEntity, RunMetrics, RunState, SpikeMonitor};

use crate::config::RunConfig;

/// The behaviors a client iteration can pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Browse,
    Write,
    Integrity,
    RecoveryProbe,
    ResourceHeavy,
    HealthMonitor,
}

/// Weighted scenario table. Selection is an independent weighted random
/// draw per iteration, not round-robin, to approximate realistic traffic.
#[derive(Debug, Clone)]
pub struct ScenarioMix {
    entries: Vec<(ScenarioKind, u32)>,
}

impl ScenarioMix {
    /// Mix used while concurrency is at or below the spike high-water mark
    pub fn normal() -> Self {
        ScenarioMix {
            entries: vec![
                (ScenarioKind::Browse, 40),
                (ScenarioKind::Write, 20),
                (ScenarioKind::Integrity, 10),
                (ScenarioKind::RecoveryProbe, 10),
                (ScenarioKind::ResourceHeavy, 10),
                (ScenarioKind::HealthMonitor, 10),
            ],
        }
    }

    /// Read-heavy mix used while concurrency is above the high-water mark:
    /// 70% read / 20% write / 10% integrity
    pub fn high_load() -> Self {
        ScenarioMix {
            entries: vec![
                (ScenarioKind::Browse, 70),
                (ScenarioKind::Write, 20),
                (ScenarioKind::Integrity, 10),
            ],
        }
    }

    pub fn pick(&self, rng: &mut StdRng) -> ScenarioKind {
        let total: u32 = self.entries.iter().map(|(_, w)| w).sum();
        let mut roll = rng.gen_range(0..total);
        for (kind, weight) in &self.entries {
            if roll < *weight {
                return *kind;
            }
            roll -= weight;
        }
        // Unreachable with non-empty entries; fall back to the last kind.
        self.entries[self.entries.len() - 1].0
    }
}

/// Everything a scenario invocation may touch
#[derive(Clone)]
pub struct ScenarioCtx {
    pub api: Arc<dyn TargetApi>,
    pub state: Arc<RunState>,
    pub metrics: Arc<RunMetrics>,
    pub spike: Arc<SpikeMonitor>,
    pub config: Arc<RunConfig>,
    pub started: Instant,
}

impl ScenarioCtx {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed().as_secs_f64() / 60.0
    }

    /// Record a request outcome into the raw registers. Returns whether the
    /// request succeeded so scenarios can branch without re-matching.
    fn record<T>(&self, result: &ClientResult<ApiResult<T>>) -> bool {
        match result {
            Ok(ok) => {
                self.metrics.record_success(ok.latency_ms(), ok.bytes);
                self.state.observe_first_response(ok.latency_ms());
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "request failed");
                self.metrics.record_failure();
                false
            }
        }
    }
}

/// Run one scenario of the given kind
pub async fn run_scenario(kind: ScenarioKind, ctx: &ScenarioCtx, rng: &mut StdRng) {
    match kind {
        ScenarioKind::Browse => browse(ctx, rng).await,
        ScenarioKind::Write => write(ctx, rng).await,
        ScenarioKind::Integrity => integrity_check(ctx, rng).await,
        ScenarioKind::RecoveryProbe => recovery_probe(ctx).await,
        ScenarioKind::ResourceHeavy => resource_heavy(ctx).await,
        ScenarioKind::HealthMonitor => health_monitor(ctx).await,
    }
}

/// Fetch a listing page, maybe drill into one post, maybe view/like it.
/// A fraction of visits wander into the user directory instead, and a
/// fraction of those register a new account.
pub async fn browse(ctx: &ScenarioCtx, rng: &mut StdRng) {
    if rng.gen_bool(ctx.config.user_directory_probability) {
        visit_user_directory(ctx, rng).await;
        return;
    }

    let page = rng.gen_range(1..=5);
    let listing = ctx.api.list_posts(page, 10, Some("createdAt")).await;
    if !ctx.record(&listing) {
        return;
    }
    let posts = match listing {
        Ok(ok) if !ok.value.is_empty() => ok.value,
        _ => return,
    };
    if !rng.gen_bool(ctx.config.detail_probability) {
        return;
    }

    let post_id = posts[rng.gen_range(0..posts.len())].id.clone();
    let detail = ctx.api.get_post(&post_id).await;
    if !ctx.record(&detail) {
        return;
    }
    let view = ctx.api.view_post(&post_id).await;
    ctx.record(&view);
    if rng.gen_bool(ctx.config.like_probability) {
        let like = ctx.api.like_post(&post_id).await;
        ctx.record(&like);
    }
}

async fn visit_user_directory(ctx: &ScenarioCtx, rng: &mut StdRng) {
    let users = ctx.api.list_users(None).await;
    if !ctx.record(&users) {
        return;
    }
    if rng.gen_bool(ctx.config.signup_probability) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let salt: u32 = rng.gen();
        let new_user = NewUser {
            name: format!("Stampede user {salt:08x}"),
            email: format!("stampede-{millis}-{salt:08x}@example.test"),
        };
        let created = ctx.api.create_user(&new_user).await;
        ctx.record(&created);
    }
}

/// Create a post with a uniquely-derived title and register it for later
/// integrity verification
pub async fn write(ctx: &ScenarioCtx, rng: &mut StdRng) {
    // Wall time plus a random salt keeps titles unique across concurrent
    // clients without coordination.
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let salt: u32 = rng.gen();
    let new_post = NewPost {
        title: format!("Stampede post {millis}-{salt:08x}"),
        content: format!("Synthetic content generated at {millis} for load verification."),
        author_id: 1,
    };

    let created = ctx.api.create_post(&new_post).await;
    if !ctx.record(&created) {
        return;
    }
    if let Ok(ok) = created {
        ctx.state.register_created(
            ok.value.id,
            CreatedEntity {
                title: new_post.title,
                content: new_post.content,
            },
        );
    }
}

/// Refetch a previously created, not-yet-verified post and check it
/// round-tripped unchanged
pub async fn integrity_check(ctx: &ScenarioCtx, rng: &mut StdRng) {
    // Already-verified ids are never picked, so re-running this on a fully
    // verified set is a no-op.
    let Some((id, submitted)) = ctx.state.pick_unverified(rng) else {
        return;
    };

    let fetched = ctx.api.get_post(&id).await;
    if !ctx.record(&fetched) {
        ctx.metrics.integrity.observe(false);
        return;
    }
    if let Ok(ok) = fetched {
        let matches = ok.value.title == submitted.title && ok.value.content == submitted.content;
        ctx.metrics.integrity.observe(matches);
        if matches {
            ctx.state.mark_verified(&id);
        } else {
            tracing::warn!(id = %id, "integrity mismatch on refetch");
        }
    }
}

/// Lightweight health request feeding the spike/recovery state machine
pub async fn recovery_probe(ctx: &ScenarioCtx) {
    let elapsed = ctx.elapsed();
    let probe = ctx.api.health().await;
    let responsive = match &probe {
        Ok(ok) => ok.latency_ms() < ctx.config.probe_responsive_ms,
        Err(_) => false,
    };
    ctx.record(&probe);
    if let Some(recovery) = ctx.spike.observe_probe(responsive, elapsed) {
        ctx.metrics.recovery_time.record(recovery.as_secs_f64());
    }
}

/// Larger-payload read whose body is retained in the bounded cache to
/// simulate memory pressure
pub async fn resource_heavy(ctx: &ScenarioCtx) {
    let listing = ctx.api.list_posts(1, 100, None).await;
    if !ctx.record(&listing) {
        return;
    }
    if let Ok(ok) = listing {
        let body = serde_json::to_string(&ok.value).unwrap_or_default();
        ctx.state.cache_payload(Uuid::now_v7().to_string(), body);
    }
}

/// Sample target memory, update the memory registers, and flag suspicious
/// per-minute growth
pub async fn health_monitor(ctx: &ScenarioCtx) {
    let health = ctx.api.health().await;
    if !ctx.record(&health) {
        return;
    }
    let Ok(ok) = health else { return };
    let Some(memory) = ok.value.memory else {
        return;
    };

    let mb = memory.heap_used_mb();
    ctx.metrics.memory_mb.record(mb);
    ctx.metrics.memory_now_mb.set(mb);
    ctx.state.observe_first_memory(mb);

    let elapsed_minutes = ctx.elapsed_minutes();
    if let Some(baseline_mb) = ctx.state.baseline().memory_mb {
        if elapsed_minutes > 0.0 {
            let growth_per_min = (mb - baseline_mb) / elapsed_minutes;
            if growth_per_min > ctx.config.leak_alert_mb_per_min {
                ctx.metrics.leak_suspicions.incr();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTarget;
    use rand::SeedableRng;
    use stampede_core::{SpikeConfig, SpikePhase};

    fn ctx_with(fake: FakeTarget) -> ScenarioCtx {
        ScenarioCtx {
            api: Arc::new(fake),
            state: Arc::new(RunState::new()),
            metrics: Arc::new(RunMetrics::new()),
            spike: Arc::new(SpikeMonitor::new(SpikeConfig {
                high_water: 100,
                dwell: Duration::from_millis(0),
            })),
            config: Arc::new(RunConfig::default()),
            started: Instant::now(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(12345)
    }

    #[test]
    fn test_mix_pick_is_deterministic_for_a_seed() {
        let mix = ScenarioMix::normal();
        let picks_a: Vec<_> = {
            let mut rng = rng();
            (0..50).map(|_| mix.pick(&mut rng)).collect()
        };
        let picks_b: Vec<_> = {
            let mut rng = rng();
            (0..50).map(|_| mix.pick(&mut rng)).collect()
        };
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_high_load_mix_only_contains_read_write_integrity() {
        let mix = ScenarioMix::high_load();
        let mut rng = rng();
        for _ in 0..200 {
            let kind = mix.pick(&mut rng);
            assert!(matches!(
                kind,
                ScenarioKind::Browse | ScenarioKind::Write | ScenarioKind::Integrity
            ));
        }
    }

    #[tokio::test]
    async fn test_write_registers_created_entity() {
        let ctx = ctx_with(FakeTarget::new());
        write(&ctx, &mut rng()).await;
        assert_eq!(ctx.state.created_count(), 1);
        assert_eq!(ctx.metrics.requests.value(), 1);
        assert_eq!(ctx.metrics.failures.value(), 0);
    }

    #[tokio::test]
    async fn test_integrity_verifies_created_entity_exactly_once() {
        let ctx = ctx_with(FakeTarget::new());
        let mut rng = rng();
        write(&ctx, &mut rng).await;

        integrity_check(&ctx, &mut rng).await;
        assert_eq!(ctx.state.verified_count(), 1);
        assert_eq!(ctx.metrics.integrity.observations(), 1);
        assert_eq!(ctx.metrics.integrity.value(), Some(1.0));

        // Second run: everything is verified, so nothing is picked and no
        // register changes.
        integrity_check(&ctx, &mut rng).await;
        assert_eq!(ctx.state.verified_count(), 1);
        assert_eq!(ctx.metrics.integrity.observations(), 1);
    }

    #[tokio::test]
    async fn test_integrity_records_mismatch_without_verifying() {
        let fake = FakeTarget::new().with_corrupt_reads();
        let ctx = ctx_with(fake);
        let mut rng = rng();
        write(&ctx, &mut rng).await;
        integrity_check(&ctx, &mut rng).await;
        assert_eq!(ctx.metrics.integrity.value(), Some(0.0));
        assert_eq!(ctx.state.verified_count(), 0);
    }

    #[tokio::test]
    async fn test_browse_absorbs_failures_into_registers() {
        let ctx = ctx_with(FakeTarget::new().with_all_requests_failing());
        browse(&ctx, &mut rng()).await;
        assert_eq!(ctx.metrics.requests.value(), 1);
        assert_eq!(ctx.metrics.failures.value(), 1);
    }

    #[tokio::test]
    async fn test_browse_user_directory_visit_with_signup() {
        let mut ctx = ctx_with(FakeTarget::new());
        ctx.config = Arc::new(RunConfig {
            user_directory_probability: 1.0,
            signup_probability: 1.0,
            ..RunConfig::default()
        });
        browse(&ctx, &mut rng()).await;
        // One directory listing plus one registration.
        assert_eq!(ctx.metrics.requests.value(), 2);
        assert_eq!(ctx.metrics.failures.value(), 0);
    }

    #[tokio::test]
    async fn test_health_monitor_sets_baseline_and_gauge() {
        let fake = FakeTarget::new().with_heap_used_mb(100.0);
        let ctx = ctx_with(fake);
        health_monitor(&ctx).await;
        assert_eq!(ctx.state.baseline().memory_mb, Some(100.0));
        assert_eq!(ctx.metrics.memory_now_mb.value(), Some(100.0));
        assert_eq!(ctx.metrics.memory_mb.len(), 1);
    }

    #[tokio::test]
    async fn test_health_monitor_flags_fast_growth() {
        let fake = FakeTarget::new().with_heap_used_mb(100.0);
        let handle = fake.handle();
        let ctx = ctx_with(fake);
        health_monitor(&ctx).await;
        assert_eq!(ctx.metrics.leak_suspicions.value(), 0);

        // Large jump over a tiny elapsed window far exceeds the per-minute
        // growth threshold.
        handle.set_heap_used_mb(500.0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        health_monitor(&ctx).await;
        assert_eq!(ctx.metrics.leak_suspicions.value(), 1);
    }

    #[tokio::test]
    async fn test_recovery_probe_confirms_recovery() {
        let ctx = ctx_with(FakeTarget::new());
        // Drive the machine into Recovering, then confirm via probe (dwell
        // is zero in this fixture).
        ctx.spike.observe_concurrency(300, Duration::from_secs(0));
        ctx.spike.observe_concurrency(10, Duration::from_secs(5));
        assert_eq!(ctx.spike.phase(), SpikePhase::Recovering);
        recovery_probe(&ctx).await;
        assert_eq!(ctx.spike.phase(), SpikePhase::Normal);
        assert_eq!(ctx.metrics.recovery_time.len(), 1);
    }

    #[tokio::test]
    async fn test_resource_heavy_fills_bounded_cache() {
        let ctx = ctx_with(FakeTarget::new());
        for _ in 0..3 {
            resource_heavy(&ctx).await;
        }
        assert_eq!(ctx.state.cached_payload_count(), 3);
    }
}
