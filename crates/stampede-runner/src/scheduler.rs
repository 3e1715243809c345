// Stage scheduler: holds live client count to the plan's target curve.
//
// Decision: the scheduler is the only spawner and retirer of client tasks.
// Clients never exit on their own, so the live count equals the spawned
// minus retired count and can be reconciled against target_at() every tick.
// Retirement is LIFO, the newest clients are asked to stop first.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use stampede_core::Checkpoint;

use crate::scenarios::ScenarioCtx;
use crate::sim::SimulatedClient;

struct ClientHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drive the run's stage plan to completion, then retire every client and
/// wait for all of them to finish their in-flight scenario.
pub async fn drive(ctx: ScenarioCtx) {
    let plan = &ctx.config.plan;
    let total = plan.total_duration();

    let mut active: Vec<ClientHandle> = Vec::new();
    let mut draining: Vec<JoinHandle<()>> = Vec::new();
    let mut spawned: u64 = 0;

    let mut ticker = tokio::time::interval(ctx.config.tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let elapsed = ctx.elapsed();
        if elapsed >= total {
            break;
        }

        let target = plan.target_at(elapsed);
        while active.len() < target {
            let (tx, rx) = watch::channel(false);
            let client = SimulatedClient::new(spawned, ctx.clone(), rx);
            active.push(ClientHandle {
                stop: tx,
                task: tokio::spawn(client.run()),
            });
            spawned += 1;
        }
        while active.len() > target {
            let handle = active.pop().expect("len checked above");
            let _ = handle.stop.send(true);
            draining.push(handle.task);
        }

        ctx.spike.observe_concurrency(active.len(), elapsed);

        let minute = elapsed.as_secs() / 60;
        let recorded = ctx.state.record_checkpoint(
            minute,
            Checkpoint {
                response_ms: ctx.metrics.last_response_ms.value(),
                open_sessions: ctx.state.open_session_count(),
            },
        );
        if recorded {
            tracing::info!(
                minute,
                live = active.len(),
                target,
                requests = ctx.metrics.requests.value(),
                failures = ctx.metrics.failures.value(),
                "checkpoint"
            );
        }
    }

    tracing::info!(spawned, "plan complete, retiring clients");
    for handle in &active {
        let _ = handle.stop.send(true);
    }
    let tasks: Vec<_> = active.into_iter().map(|h| h.task).chain(draining).collect();
    for joined in futures::future::join_all(tasks).await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "client task panicked");
        }
    }
}
