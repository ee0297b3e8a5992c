//! ═══════════════════════════════════════════════════════════════════════════════
//! STATS — The System Stats Model
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The only mutable entity in the core. Plain data: both simulators mutate it,
//! panels only ever see snapshots.
//!
//! Invariants:
//! - `threat_level` is CAUTION exactly while `anomaly_active`, MINIMAL otherwise
//! - `anomaly_progress` stays in 0..=100 and is 0 whenever the anomaly is inactive
//! - cpu/memory/network stay within their telemetry clamps
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Locations a fresh anomaly can be injected at
pub const ANOMALY_LOCATIONS: [&str; 4] = [
    "UPLINK_NODE_B7",
    "MAIN_SERVER_RACK_3",
    "EXTERNAL_FIREWALL",
    "ARC_REACTOR_COOLANT",
];

/// Location of the anomaly the HUD starts with
pub const INITIAL_ANOMALY_LOCATION: &str = "GRID_SUBSTATION_4";

pub const CPU_BOUNDS: (f64, f64) = (10.0, 100.0);
pub const MEMORY_BOUNDS: (f64, f64) = (30.0, 100.0);
pub const NETWORK_BOUNDS: (f64, f64) = (20.0, 1000.0);

/// Overall threat assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Minimal,
    Caution,
    /// Never assigned by the simulators
    Critical,
}

impl ThreatLevel {
    /// Threat level implied by the anomaly flag
    pub fn for_anomaly(active: bool) -> Self {
        if active {
            ThreatLevel::Caution
        } else {
            ThreatLevel::Minimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThreatLevel::Minimal => "MINIMAL",
            ThreatLevel::Caution => "CAUTION",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp `value` into `[lo, hi]`. NaN collapses to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Snapshot of simulated system health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    pub threat_level: ThreatLevel,
    pub anomaly_active: bool,
    pub anomaly_location: String,
    pub anomaly_progress: u8,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::initial()
    }
}

impl SystemStats {
    /// The demo state the HUD boots into: an anomaly already being healed
    pub fn initial() -> Self {
        Self {
            cpu: 24.0,
            memory: 42.0,
            network: 120.0,
            threat_level: ThreatLevel::Caution,
            anomaly_active: true,
            anomaly_location: INITIAL_ANOMALY_LOCATION.to_string(),
            anomaly_progress: 0,
        }
    }

    /// Healthy state with no anomaly
    pub fn nominal() -> Self {
        Self {
            threat_level: ThreatLevel::Minimal,
            anomaly_active: false,
            ..Self::initial()
        }
    }

    /// Check every invariant, reporting the first violation
    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected = ThreatLevel::for_anomaly(self.anomaly_active);
        if self.threat_level != expected {
            return Err(ValidationError::ConstraintViolation(format!(
                "threat level {} with anomaly_active={} (expected {})",
                self.threat_level, self.anomaly_active, expected
            )));
        }
        if self.anomaly_progress > 100 {
            return Err(ValidationError::ConstraintViolation(format!(
                "anomaly progress {} exceeds 100",
                self.anomaly_progress
            )));
        }
        if !self.anomaly_active && self.anomaly_progress != 0 {
            return Err(ValidationError::ConstraintViolation(format!(
                "anomaly progress {} while inactive",
                self.anomaly_progress
            )));
        }
        for (name, value, (lo, hi)) in [
            ("cpu", self.cpu, CPU_BOUNDS),
            ("memory", self.memory, MEMORY_BOUNDS),
            ("network", self.network, NETWORK_BOUNDS),
        ] {
            if !(lo..=hi).contains(&value) {
                return Err(ValidationError::ConstraintViolation(format!(
                    "{} {:.2} outside [{}, {}]",
                    name, value, lo, hi
                )));
            }
        }
        Ok(())
    }
}
