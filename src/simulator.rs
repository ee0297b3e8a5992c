//! ═══════════════════════════════════════════════════════════════════════════════
//! SIMULATOR — Owned State + Single Reducer
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The simulator owns the stats record, the timer table and the RNG. Timer
//! expiries and user overrides all go through `dispatch`, which applies the
//! lifecycle and then rearranges the anomaly timers for the new phase:
//!
//! - HEALING → progress tick armed (periodic), dwell disarmed
//! - IDLE    → dwell armed (one-shot, sampled), progress tick disarmed
//!
//! It has no notion of wall time. Callers pass `now` (from any `Clock`) and
//! call `advance` whenever `next_deadline` is reached.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyConfig, AnomalyEvent, AnomalyLifecycle, AnomalyPhase, Transition};
use crate::clock::{Due, TimerKind, Timers};
use crate::stats::SystemStats;
use crate::telemetry::{TelemetryConfig, TelemetrySimulator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub telemetry: TelemetryConfig,
    pub anomaly: AnomalyConfig,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

/// Something the simulator did while advancing
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Telemetry { at: Duration },
    Anomaly { at: Duration, transition: Transition },
}

impl Step {
    pub fn at(&self) -> Duration {
        match self {
            Step::Telemetry { at } | Step::Anomaly { at, .. } => *at,
        }
    }
}

pub struct Simulator<R: Rng = StdRng> {
    stats: SystemStats,
    telemetry: TelemetrySimulator,
    lifecycle: AnomalyLifecycle,
    timers: Timers,
    rng: R,
    running: bool,
}

impl Simulator<StdRng> {
    /// Seeded from `config.seed` when present, OS entropy otherwise
    pub fn from_config(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }

    pub fn seeded(config: SimulationConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulator<R> {
    pub fn new(config: SimulationConfig, rng: R) -> Self {
        Self {
            stats: SystemStats::initial(),
            telemetry: TelemetrySimulator::new(config.telemetry),
            lifecycle: AnomalyLifecycle::new(config.anomaly),
            timers: Timers::new(),
            rng,
            running: false,
        }
    }

    /// Replace the starting record (before `start`)
    pub fn with_stats(mut self, stats: SystemStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    pub fn snapshot(&self) -> SystemStats {
        self.stats.clone()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Arm telemetry and the anomaly timer for the current phase
    pub fn start(&mut self, now: Duration) {
        if self.running {
            return;
        }
        self.running = true;
        let interval = Duration::from_millis(self.telemetry.config().interval_ms);
        self.timers.arm_every(TimerKind::Telemetry, now, interval);
        self.arrange_anomaly_timers(now);
    }

    /// Disarm every timer. Overrides still mutate the stats afterwards.
    pub fn stop(&mut self) {
        self.running = false;
        self.timers.disarm_all();
    }

    /// Fire every timer due at or before `now`, each at its own deadline
    pub fn advance(&mut self, now: Duration) -> Vec<Step> {
        let mut steps = Vec::new();
        while let Some(Due { kind, deadline }) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Telemetry => {
                    self.telemetry.tick(&mut self.stats, &mut self.rng);
                    steps.push(Step::Telemetry { at: deadline });
                }
                TimerKind::AnomalyDwell => {
                    let transition = self.dispatch(AnomalyEvent::DwellElapsed, deadline);
                    steps.push(Step::Anomaly {
                        at: deadline,
                        transition,
                    });
                }
                TimerKind::AnomalyTick => {
                    let transition = self.dispatch(AnomalyEvent::ProgressTick, deadline);
                    steps.push(Step::Anomaly {
                        at: deadline,
                        transition,
                    });
                }
            }
        }
        steps
    }

    /// Apply one lifecycle event and keep the timers consistent with the phase
    pub fn dispatch(&mut self, event: AnomalyEvent, now: Duration) -> Transition {
        let transition = self.lifecycle.apply(&mut self.stats, event, &mut self.rng);
        if self.running && transition.changes_phase() {
            self.arrange_anomaly_timers(now);
        }
        transition
    }

    pub fn resolve_anomaly(&mut self, now: Duration) -> Transition {
        self.dispatch(AnomalyEvent::Resolve, now)
    }

    pub fn trigger_new_anomaly(&mut self, now: Duration) -> Transition {
        self.dispatch(AnomalyEvent::Trigger, now)
    }

    fn arrange_anomaly_timers(&mut self, now: Duration) {
        match AnomalyPhase::of(&self.stats) {
            AnomalyPhase::Healing { .. } => {
                self.timers.disarm(TimerKind::AnomalyDwell);
                self.timers
                    .arm_every(TimerKind::AnomalyTick, now, self.lifecycle.tick_period());
            }
            AnomalyPhase::Idle => {
                self.timers.disarm(TimerKind::AnomalyTick);
                let dwell = self.lifecycle.sample_dwell(&mut self.rng);
                self.timers.arm_once(TimerKind::AnomalyDwell, now, dwell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ThreatLevel;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn sim() -> Simulator {
        Simulator::seeded(SimulationConfig::default(), 42)
    }

    #[test]
    fn test_start_arms_telemetry_and_progress() {
        let mut sim = sim();
        assert_eq!(sim.timers().armed_count(), 0);
        sim.start(ms(0));
        assert!(sim.timers().is_armed(TimerKind::Telemetry));
        assert!(sim.timers().is_armed(TimerKind::AnomalyTick));
        assert!(!sim.timers().is_armed(TimerKind::AnomalyDwell));
        assert_eq!(sim.next_deadline(), Some(ms(150)));
    }

    #[test]
    fn test_start_while_idle_arms_dwell() {
        let mut sim = sim().with_stats(SystemStats::nominal());
        sim.start(ms(0));
        let dwell = sim.timers().deadline(TimerKind::AnomalyDwell).unwrap();
        assert!(dwell >= ms(45_000) && dwell <= ms(75_000));
        assert!(!sim.timers().is_armed(TimerKind::AnomalyTick));
    }

    #[test]
    fn test_nothing_happens_before_start() {
        let mut sim = sim();
        assert!(sim.advance(ms(60_000)).is_empty());
        assert_eq!(sim.stats(), &SystemStats::initial());
    }

    #[test]
    fn test_initial_anomaly_heals_on_fifty_first_tick() {
        let mut sim = sim();
        sim.start(ms(0));

        sim.advance(ms(7_500));
        assert!(sim.stats().anomaly_active);
        assert_eq!(sim.stats().anomaly_progress, 100);

        let steps = sim.advance(ms(7_650));
        assert!(steps.contains(&Step::Anomaly {
            at: ms(7_650),
            transition: Transition::Healed
        }));
        assert!(!sim.stats().anomaly_active);
        assert_eq!(sim.stats().threat_level, ThreatLevel::Minimal);

        // Dwell measured from the heal
        let dwell = sim.timers().deadline(TimerKind::AnomalyDwell).unwrap();
        assert!(dwell >= ms(7_650 + 45_000) && dwell <= ms(7_650 + 75_000));
        assert!(!sim.timers().is_armed(TimerKind::AnomalyTick));
    }

    #[test]
    fn test_telemetry_fires_every_two_seconds() {
        let mut sim = sim();
        sim.start(ms(0));
        let telemetry: Vec<Duration> = sim
            .advance(ms(6_999))
            .into_iter()
            .filter(|s| matches!(s, Step::Telemetry { .. }))
            .map(|s| s.at())
            .collect();
        assert_eq!(telemetry, vec![ms(2_000), ms(4_000), ms(6_000)]);
    }

    #[test]
    fn test_resolve_swaps_tick_for_dwell() {
        let mut sim = sim();
        sim.start(ms(0));
        sim.advance(ms(1_500));
        assert_eq!(sim.resolve_anomaly(ms(1_600)), Transition::Resolved);
        assert!(!sim.timers().is_armed(TimerKind::AnomalyTick));
        let dwell = sim.timers().deadline(TimerKind::AnomalyDwell).unwrap();
        assert!(dwell >= ms(1_600 + 45_000));
    }

    #[test]
    fn test_trigger_restart_keeps_tick_schedule() {
        let mut sim = sim();
        sim.start(ms(0));
        sim.advance(ms(300));
        let before = sim.timers().deadline(TimerKind::AnomalyTick);
        let t = sim.trigger_new_anomaly(ms(320));
        assert!(matches!(t, Transition::Injected { restarted: true, .. }));
        assert_eq!(sim.timers().deadline(TimerKind::AnomalyTick), before);
        assert_eq!(sim.stats().anomaly_progress, 0);
    }

    #[test]
    fn test_dwell_injects_and_arms_tick() {
        let mut sim = sim().with_stats(SystemStats::nominal());
        sim.start(ms(0));
        let dwell = sim.timers().deadline(TimerKind::AnomalyDwell).unwrap();
        sim.advance(dwell);
        assert!(sim.stats().anomaly_active);
        assert_eq!(sim.stats().threat_level, ThreatLevel::Caution);
        assert_eq!(
            sim.timers().deadline(TimerKind::AnomalyTick),
            Some(dwell + ms(150))
        );
    }

    #[test]
    fn test_stop_disarms_everything() {
        let mut sim = sim();
        sim.start(ms(0));
        sim.stop();
        assert_eq!(sim.timers().armed_count(), 0);
        assert!(!sim.is_running());
        // Overrides still apply but arm nothing
        sim.resolve_anomaly(ms(10));
        assert!(!sim.stats().anomaly_active);
        assert_eq!(sim.timers().armed_count(), 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let mut sim = sim();
            sim.start(ms(0));
            sim.advance(ms(300_000));
            sim.snapshot()
        };
        assert_eq!(run(), run());
    }
}
