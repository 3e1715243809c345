// Simulated client: one task looping scenario iterations until retired.
//
// Each client owns a seeded RNG derived from the run seed and its spawn
// index, so a fixed seed reproduces every client's scenario sequence. The
// scheduler retires clients through a per-client watch channel; a client
// finishes its in-flight scenario before exiting, it is never aborted
// mid-request.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use uuid::Uuid;

use crate::scenarios::{run_scenario, ScenarioCtx, ScenarioMix};

/// A single simulated user driving the target in a loop
pub struct SimulatedClient {
    index: u64,
    ctx: ScenarioCtx,
    rng: StdRng,
    stop: watch::Receiver<bool>,
}

impl SimulatedClient {
    pub fn new(index: u64, ctx: ScenarioCtx, stop: watch::Receiver<bool>) -> Self {
        let base = ctx.config.seed.unwrap_or_else(rand::random);
        SimulatedClient {
            index,
            ctx,
            rng: StdRng::seed_from_u64(base.wrapping_add(index)),
            stop,
        }
    }

    /// Iterate scenarios until the stop flag flips. Each iteration opens a
    /// session, runs one weighted-random scenario, closes the session, and
    /// pauses for the configured think time.
    pub async fn run(mut self) {
        tracing::debug!(client = self.index, "client started");
        loop {
            if *self.stop.borrow() {
                break;
            }

            let session = Uuid::now_v7();
            self.ctx.state.open_session(session);

            // Above the spike high-water mark the traffic shape shifts to
            // the read-heavy mix.
            let mix = if self.ctx.state.open_session_count() > self.ctx.config.spike.high_water {
                ScenarioMix::high_load()
            } else {
                ScenarioMix::normal()
            };
            let kind = mix.pick(&mut self.rng);
            run_scenario(kind, &self.ctx, &mut self.rng).await;

            self.ctx.state.close_session(session);

            // Wake early if retired during the pause.
            let think = self.ctx.config.think_time;
            tokio::select! {
                _ = tokio::time::sleep(think) => {}
                _ = self.stop.changed() => {}
            }
        }
        tracing::debug!(client = self.index, "client retired");
    }
}
