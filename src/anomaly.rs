//! ═══════════════════════════════════════════════════════════════════════════════
//! ANOMALY — Self-Healing Fault Lifecycle
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Two states, driven entirely by events:
//!
//! ```text
//!            dwell elapsed / trigger
//!   IDLE ───────────────────────────────▶ HEALING ──┐ progress tick
//!    ▲                                       │  ◀────┘ (+2, max 100)
//!    └────── tick at 100 / resolve ──────────┘
//! ```
//!
//! This module owns the transition rules only. Which timer is armed is
//! decided by the simulator from the resulting phase.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::{SystemStats, ThreatLevel, ANOMALY_LOCATIONS};

/// Tuning for the lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Shortest idle dwell before a new anomaly (ms)
    pub dwell_min_ms: u64,
    /// Longest idle dwell before a new anomaly (ms)
    pub dwell_max_ms: u64,
    /// Period of the healing progress tick (ms)
    pub tick_ms: u64,
    /// Progress gained per tick
    pub progress_step: u8,
    /// Candidate injection sites
    pub locations: Vec<String>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            dwell_min_ms: 45_000,
            dwell_max_ms: 75_000,
            tick_ms: 150,
            progress_step: 2,
            locations: ANOMALY_LOCATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyPhase {
    Idle,
    Healing { progress: u8 },
}

impl AnomalyPhase {
    pub fn of(stats: &SystemStats) -> Self {
        if stats.anomaly_active {
            AnomalyPhase::Healing {
                progress: stats.anomaly_progress,
            }
        } else {
            AnomalyPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyEvent {
    /// The idle dwell timer fired
    DwellElapsed,
    /// The healing tick timer fired
    ProgressTick,
    /// User override: heal now
    Resolve,
    /// Manual fault injection
    Trigger,
}

/// What an event did to the stats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new anomaly started. `restarted` is set when one was already healing.
    Injected { location: String, restarted: bool },
    /// Healing progressed
    Advanced { progress: u8 },
    /// Healing finished on its own
    Healed,
    /// Healing cut short by the override
    Resolved,
    /// Event has no effect in the current phase
    Ignored,
}

impl Transition {
    /// True when the phase flipped and the timers must be rearranged
    pub fn changes_phase(&self) -> bool {
        match self {
            Transition::Injected { restarted, .. } => !restarted,
            Transition::Healed | Transition::Resolved => true,
            Transition::Advanced { .. } | Transition::Ignored => false,
        }
    }
}

/// The lifecycle transition function
#[derive(Debug, Clone)]
pub struct AnomalyLifecycle {
    config: AnomalyConfig,
}

impl AnomalyLifecycle {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.config.tick_ms)
    }

    /// Uniform dwell in `[dwell_min_ms, dwell_max_ms]`
    pub fn sample_dwell<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.config.dwell_min_ms.min(self.config.dwell_max_ms);
        let hi = self.config.dwell_min_ms.max(self.config.dwell_max_ms);
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        stats: &mut SystemStats,
        event: AnomalyEvent,
        rng: &mut R,
    ) -> Transition {
        match (AnomalyPhase::of(stats), event) {
            (AnomalyPhase::Idle, AnomalyEvent::DwellElapsed | AnomalyEvent::Trigger) => {
                self.inject(stats, false, rng)
            }
            (AnomalyPhase::Healing { .. }, AnomalyEvent::Trigger) => self.inject(stats, true, rng),
            (AnomalyPhase::Healing { progress }, AnomalyEvent::ProgressTick) => {
                if progress >= 100 {
                    clear(stats);
                    Transition::Healed
                } else {
                    let next = progress.saturating_add(self.config.progress_step).min(100);
                    stats.anomaly_progress = next;
                    Transition::Advanced { progress: next }
                }
            }
            (AnomalyPhase::Healing { .. }, AnomalyEvent::Resolve) => {
                clear(stats);
                Transition::Resolved
            }
            _ => Transition::Ignored,
        }
    }

    fn inject<R: Rng + ?Sized>(
        &self,
        stats: &mut SystemStats,
        restarted: bool,
        rng: &mut R,
    ) -> Transition {
        let locations = &self.config.locations;
        if !locations.is_empty() {
            stats.anomaly_location = locations[rng.gen_range(0..locations.len())].clone();
        }
        stats.anomaly_active = true;
        stats.anomaly_progress = 0;
        stats.threat_level = ThreatLevel::Caution;
        Transition::Injected {
            location: stats.anomaly_location.clone(),
            restarted,
        }
    }
}

fn clear(stats: &mut SystemStats) {
    stats.anomaly_active = false;
    stats.anomaly_progress = 0;
    stats.threat_level = ThreatLevel::Minimal;
}
