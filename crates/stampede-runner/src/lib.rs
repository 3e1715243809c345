// Load-generation engine: stage scheduling, simulated clients, and the
// scenario library, wired together by the Runner.
//
// Depends on the target only through the TargetApi trait, so everything
// here is testable against the in-memory fake in `testing`.

pub mod config;
pub mod run;
pub mod scenarios;
pub mod scheduler;
pub mod sim;
pub mod testing;

pub use config::RunConfig;
pub use run::Runner;
pub use scenarios::{run_scenario, ScenarioCtx, ScenarioKind, ScenarioMix};
pub use sim::SimulatedClient;
pub use testing::FakeTarget;
