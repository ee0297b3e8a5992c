//! ═══════════════════════════════════════════════════════════════════════════════
//! TELEMETRY — Bounded Random-Walk Signal Generator
//! ═══════════════════════════════════════════════════════════════════════════════
//! Every telemetry tick each field moves by `(u - 0.5) * amplitude` with
//! `u ~ U[0, 1)` and is clamped back into its bounds. No state machine.
//! ═══════════════════════════════════════════════════════════════════════════════

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::{clamp, SystemStats, CPU_BOUNDS, MEMORY_BOUNDS, NETWORK_BOUNDS};

/// Random-walk parameters for one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    /// Full width of the uniform step
    pub amplitude: f64,
    pub lo: f64,
    pub hi: f64,
}

impl Perturbation {
    pub const fn new(amplitude: f64, (lo, hi): (f64, f64)) -> Self {
        Self { amplitude, lo, hi }
    }

    /// Step `value` using `unit` drawn from [0, 1)
    pub fn apply(&self, value: f64, unit: f64) -> f64 {
        clamp(value + (unit - 0.5) * self.amplitude, self.lo, self.hi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Period of the telemetry timer
    pub interval_ms: u64,
    pub cpu: Perturbation,
    pub memory: Perturbation,
    pub network: Perturbation,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            cpu: Perturbation::new(8.0, CPU_BOUNDS),
            memory: Perturbation::new(3.0, MEMORY_BOUNDS),
            network: Perturbation::new(80.0, NETWORK_BOUNDS),
        }
    }
}

/// Perturbs cpu/memory/network on each telemetry tick
#[derive(Debug, Clone)]
pub struct TelemetrySimulator {
    config: TelemetryConfig,
}

impl TelemetrySimulator {
    pub fn new(config: TelemetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn tick<R: Rng + ?Sized>(&self, stats: &mut SystemStats, rng: &mut R) {
        stats.cpu = self.config.cpu.apply(stats.cpu, rng.gen::<f64>());
        stats.memory = self.config.memory.apply(stats.memory, rng.gen::<f64>());
        stats.network = self.config.network.apply(stats.network, rng.gen::<f64>());
    }
}
