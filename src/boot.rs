//! ═══════════════════════════════════════════════════════════════════════════════
//! BOOT — Authorization Gate and Diagnostics Sequence
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! LOCKED ──key supplied──▶ DIAGNOSTICS ──8 lines × 400ms──▶ settle 1000ms ──▶ READY
//!
//! Simulators are only started once READY is reached.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const BOOT_LOGS: [&str; 8] = [
    "INITIALIZING_CORE_SERVICES...",
    "UPLINK_ESTABLISHED_WITH_STARK_SATELLITE_B83",
    "CHECKING_ARC_REACTOR_OUTPUT... 100%",
    "LOADING_PERSONALITY_MATRIX: JARVIS_V7.2",
    "CALIBRATING_OPTICAL_SENSORS...",
    "MAPPING_GEOSPATIAL_GRID...",
    "CLEAN_SLATE_PROTOCOL: DISABLED",
    "SYSTEM_READY_FOR_INPUT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootGate {
    Authorized,
    Locked,
}

impl BootGate {
    pub fn check(has_api_key: bool) -> Self {
        if has_api_key {
            BootGate::Authorized
        } else {
            BootGate::Locked
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, BootGate::Authorized)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    /// Delay between diagnostic lines (ms)
    pub step_ms: u64,
    /// Pause after the last line before READY (ms)
    pub settle_ms: u64,
    /// Skip the diagnostics entirely
    pub skip: bool,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            step_ms: 400,
            settle_ms: 1000,
            skip: false,
        }
    }
}

/// One diagnostic line as it appears
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootProgress {
    /// 1-based
    pub index: usize,
    pub line: &'static str,
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct BootSequence {
    config: BootConfig,
}

impl BootSequence {
    pub fn new(config: BootConfig) -> Self {
        Self { config }
    }

    /// Progress after `index` lines have been shown
    pub fn percent(index: usize) -> f64 {
        (index.min(BOOT_LOGS.len()) as f64 / BOOT_LOGS.len() as f64) * 100.0
    }

    /// Total time from start to READY
    pub fn total_duration(&self) -> Duration {
        if self.config.skip {
            return Duration::ZERO;
        }
        Duration::from_millis(self.config.step_ms * BOOT_LOGS.len() as u64 + self.config.settle_ms)
    }

    /// Emit the diagnostic lines on schedule, then settle
    pub async fn run<F>(&self, mut on_line: F)
    where
        F: FnMut(BootProgress),
    {
        if self.config.skip {
            return;
        }
        let step = Duration::from_millis(self.config.step_ms);
        for (i, line) in BOOT_LOGS.iter().enumerate() {
            tokio::time::sleep(step).await;
            on_line(BootProgress {
                index: i + 1,
                line,
                percent: Self::percent(i + 1),
            });
        }
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate() {
        assert!(BootGate::check(true).is_authorized());
        assert_eq!(BootGate::check(false), BootGate::Locked);
    }

    #[test]
    fn test_percent() {
        assert_eq!(BootSequence::percent(0), 0.0);
        assert_eq!(BootSequence::percent(2), 25.0);
        assert_eq!(BootSequence::percent(8), 100.0);
        assert_eq!(BootSequence::percent(12), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_every_line_then_settles() {
        let boot = BootSequence::new(BootConfig::default());
        assert_eq!(boot.total_duration(), Duration::from_millis(4_200));

        let start = tokio::time::Instant::now();
        let mut seen = Vec::new();
        boot.run(|p| seen.push((p.index, p.line, start.elapsed()))).await;

        assert_eq!(seen.len(), 8);
        assert_eq!(seen[0].1, "INITIALIZING_CORE_SERVICES...");
        assert_eq!(seen[7].1, "SYSTEM_READY_FOR_INPUT");
        assert!(seen[0].2 >= Duration::from_millis(400));
        assert!(start.elapsed() >= Duration::from_millis(4_200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_is_instant() {
        let boot = BootSequence::new(BootConfig {
            skip: true,
            ..BootConfig::default()
        });
        let mut count = 0;
        boot.run(|_| count += 1).await;
        assert_eq!(count, 0);
        assert_eq!(boot.total_duration(), Duration::ZERO);
    }
}
