// Spike/recovery state machine: NORMAL -> SPIKING -> RECOVERING -> NORMAL.
//
// Concurrency observations come from the scheduler tick; responsiveness
// observations come from the recovery-probe scenario. Time is expressed as
// elapsed run time, which keeps the machine deterministic under test.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Tuning for spike detection and recovery confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeConfig {
    /// Live-concurrency high-water mark that marks the start of a spike
    pub high_water: usize,
    /// How long recovery probes must stay responsive before recovery is
    /// considered stable
    pub dwell: Duration,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        SpikeConfig {
            high_water: 100,
            dwell: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpikePhase {
    Normal,
    Spiking,
    Recovering,
}

#[derive(Debug, Default)]
struct SpikeWindow {
    phase_started_at: Option<Duration>,
    recovery_started_at: Option<Duration>,
    stable_since: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    phase: SpikePhase,
    window: SpikeWindow,
    completed_cycles: u32,
}

/// Tracks spike windows across the run. Tolerates multiple spike cycles and
/// never double-counts a recovery that is still pending.
#[derive(Debug)]
pub struct SpikeMonitor {
    config: SpikeConfig,
    inner: Mutex<Inner>,
}

impl SpikeMonitor {
    pub fn new(config: SpikeConfig) -> Self {
        SpikeMonitor {
            config,
            inner: Mutex::new(Inner {
                phase: SpikePhase::Normal,
                window: SpikeWindow::default(),
                completed_cycles: 0,
            }),
        }
    }

    pub fn phase(&self) -> SpikePhase {
        self.inner.lock().expect("spike lock poisoned").phase
    }

    pub fn completed_cycles(&self) -> u32 {
        self.inner
            .lock()
            .expect("spike lock poisoned")
            .completed_cycles
    }

    /// Feed the current live client count at elapsed run time `now`.
    pub fn observe_concurrency(&self, live: usize, now: Duration) {
        let mut inner = self.inner.lock().expect("spike lock poisoned");
        match inner.phase {
            SpikePhase::Normal => {
                if live > self.config.high_water && inner.window.phase_started_at.is_none() {
                    tracing::debug!(live, elapsed_secs = now.as_secs(), "spike started");
                    inner.phase = SpikePhase::Spiking;
                    inner.window.phase_started_at = Some(now);
                }
            }
            SpikePhase::Spiking => {
                if live <= self.config.high_water && inner.window.recovery_started_at.is_none() {
                    tracing::debug!(live, elapsed_secs = now.as_secs(), "spike ended, recovering");
                    inner.phase = SpikePhase::Recovering;
                    inner.window.recovery_started_at = Some(now);
                    inner.window.stable_since = None;
                }
            }
            SpikePhase::Recovering => {
                // A re-spike before recovery is confirmed restarts the cycle
                // without recording a recovery sample.
                if live > self.config.high_water {
                    tracing::debug!(live, elapsed_secs = now.as_secs(), "re-spike during recovery");
                    inner.phase = SpikePhase::Spiking;
                    inner.window.recovery_started_at = None;
                    inner.window.stable_since = None;
                }
            }
        }
    }

    /// Feed a recovery-probe outcome at elapsed run time `now`.
    ///
    /// Returns the recovery duration (`recovery_started_at -> now`) when this
    /// probe confirms a stable recovery, which also resets the window for the
    /// next cycle. Returns `None` otherwise.
    pub fn observe_probe(&self, responsive: bool, now: Duration) -> Option<Duration> {
        let mut inner = self.inner.lock().expect("spike lock poisoned");
        if inner.phase != SpikePhase::Recovering {
            return None;
        }
        let recovery_started_at = inner.window.recovery_started_at?;

        if !responsive {
            inner.window.stable_since = None;
            return None;
        }

        let stable_since = *inner.window.stable_since.get_or_insert(now);
        if now.saturating_sub(stable_since) < self.config.dwell {
            return None;
        }

        let recovery = now.saturating_sub(recovery_started_at);
        tracing::info!(
            recovery_secs = recovery.as_secs_f64(),
            "recovery confirmed stable"
        );
        inner.phase = SpikePhase::Normal;
        inner.window = SpikeWindow::default();
        inner.completed_cycles += 1;
        Some(recovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn monitor() -> SpikeMonitor {
        SpikeMonitor::new(SpikeConfig {
            high_water: 100,
            dwell: secs(5),
        })
    }

    #[test]
    fn test_single_cycle_from_concurrency_trace() {
        // Concurrency trace 10, 10, 300, 300, 10, 10 at one-second ticks.
        let m = monitor();
        for (t, live) in [10, 10, 300, 300, 10, 10].into_iter().enumerate() {
            m.observe_concurrency(live, secs(t as u64));
        }
        assert_eq!(m.phase(), SpikePhase::Recovering);

        // Probes stay responsive; recovery started at t=4.
        assert_eq!(m.observe_probe(true, secs(6)), None);
        assert_eq!(m.observe_probe(true, secs(8)), None);
        let recovery = m.observe_probe(true, secs(11)).unwrap();
        assert_eq!(recovery, secs(7)); // 11 - 4
        assert_eq!(m.phase(), SpikePhase::Normal);
        assert_eq!(m.completed_cycles(), 1);
    }

    #[test]
    fn test_unresponsive_probe_resets_dwell() {
        let m = monitor();
        m.observe_concurrency(300, secs(0));
        m.observe_concurrency(10, secs(10));
        assert_eq!(m.observe_probe(true, secs(11)), None);
        assert_eq!(m.observe_probe(false, secs(13)), None);
        // Dwell restarts from the next responsive probe.
        assert_eq!(m.observe_probe(true, secs(14)), None);
        assert_eq!(m.observe_probe(true, secs(18)), None);
        let recovery = m.observe_probe(true, secs(19)).unwrap();
        assert_eq!(recovery, secs(9)); // 19 - 10
    }

    #[test]
    fn test_probe_outside_recovery_is_ignored() {
        let m = monitor();
        assert_eq!(m.observe_probe(true, secs(1)), None);
        m.observe_concurrency(300, secs(2));
        assert_eq!(m.observe_probe(true, secs(3)), None);
        assert_eq!(m.completed_cycles(), 0);
    }

    #[test]
    fn test_two_distinct_spike_cycles() {
        let m = monitor();
        // First spike and recovery.
        m.observe_concurrency(150, secs(0));
        m.observe_concurrency(10, secs(20));
        assert_eq!(m.observe_probe(true, secs(21)), None);
        assert!(m.observe_probe(true, secs(27)).is_some());
        // Second spike and recovery.
        m.observe_concurrency(150, secs(60));
        assert_eq!(m.phase(), SpikePhase::Spiking);
        m.observe_concurrency(10, secs(80));
        assert_eq!(m.observe_probe(true, secs(81)), None);
        assert!(m.observe_probe(true, secs(87)).is_some());
        assert_eq!(m.completed_cycles(), 2);
    }

    #[test]
    fn test_respike_during_recovery_does_not_record() {
        let m = monitor();
        m.observe_concurrency(300, secs(0));
        m.observe_concurrency(10, secs(10));
        assert_eq!(m.observe_probe(true, secs(11)), None);
        // Load comes back before the dwell completes.
        m.observe_concurrency(300, secs(12));
        assert_eq!(m.phase(), SpikePhase::Spiking);
        assert_eq!(m.observe_probe(true, secs(20)), None);
        assert_eq!(m.completed_cycles(), 0);
    }

    #[test]
    fn test_concurrency_at_mark_is_not_a_spike() {
        let m = monitor();
        m.observe_concurrency(100, secs(0));
        assert_eq!(m.phase(), SpikePhase::Normal);
        m.observe_concurrency(101, secs(1));
        assert_eq!(m.phase(), SpikePhase::Spiking);
        // Dropping back *at* the mark starts recovery.
        m.observe_concurrency(100, secs(2));
        assert_eq!(m.phase(), SpikePhase::Recovering);
    }
}
