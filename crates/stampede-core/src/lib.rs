// Stampede core engine
//
// This crate holds everything about a load-test run that is pure logic:
// metric registers, the stage plan and its concurrency curve, the shared
// run-state tracker, the spike/recovery state machine, and the post-run
// analysis engine. No I/O lives here; the runner crate drives real HTTP
// traffic and feeds observations in.
//
// Key design decisions:
// - Registers are concurrency-safe accumulators (atomics, append-only
//   vectors); scenario code only ever writes, reduction happens once at
//   report time
// - Run state mutation goes through idempotent insert/set methods keyed by
//   entity id, so concurrent clients never need coordination beyond that
// - Ramp vs plateau is an explicit field on Stage
// - All classification thresholds are configurable data with tuned defaults

pub mod analysis;
pub mod error;
pub mod metrics;
pub mod spike;
pub mod stage;
pub mod state;

// Re-exports for convenience
pub use analysis::{
    analyze, classify_status, memory_tier, recommendations, AnalysisConfig, AnalysisInput,
    MemoryTier, PassCriteria, RunReport, SecondaryThresholds, StatusThresholds, SystemStatus,
    Verdict,
};
pub use error::{CoreError, Result};
pub use metrics::{Counter, Gauge, MetricsSnapshot, Rate, RunMetrics, Trend, TrendSummary};
pub use spike::{SpikeConfig, SpikeMonitor, SpikePhase};
pub use stage::{Ramp, Stage, StagePlan};
pub use state::{Baseline, Checkpoint, CreatedEntity, RunState, PAYLOAD_CACHE_CAPACITY};
