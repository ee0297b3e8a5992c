//! Dashboard: core status, self-healing overlay, telemetry trends, threat bars.

use std::collections::VecDeque;

use colored::*;
use rand::Rng;

use crate::anomaly::Transition;
use crate::display::{bar, section, sparkline};
use crate::heart::HeartEvent;
use crate::stats::{SystemStats, CPU_BOUNDS, NETWORK_BOUNDS};

/// Samples kept for the trend lines
pub const HISTORY_LEN: usize = 20;
const EVENT_LEN: usize = 6;

pub const THREAT_VECTORS: [&str; 4] = ["BIOMETRIC", "CYBER", "KINETIC", "THERMAL"];

/// Bar heights (percent) for the threat assessment. CYBER is pinned while an
/// anomaly is active; the rest are decoration.
pub fn threat_bars<R: Rng + ?Sized>(stats: &SystemStats, rng: &mut R) -> [(&'static str, f64); 4] {
    THREAT_VECTORS.map(|name| {
        let height = if stats.anomaly_active && name == "CYBER" {
            85.0
        } else {
            20.0 + rng.gen::<f64>() * 30.0
        };
        (name, height)
    })
}

#[derive(Debug, Clone, Default)]
pub struct DashboardPanel {
    cpu: VecDeque<f64>,
    network: VecDeque<f64>,
    events: VecDeque<String>,
}

impl DashboardPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot to the trend history
    pub fn record(&mut self, stats: &SystemStats) {
        push_bounded(&mut self.cpu, stats.cpu, HISTORY_LEN);
        push_bounded(&mut self.network, stats.network, HISTORY_LEN);
    }

    pub fn history_len(&self) -> usize {
        self.cpu.len()
    }

    /// Event stream, oldest first
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    /// Log a lifecycle transition in the event stream
    pub fn push_event(&mut self, event: &HeartEvent) {
        let secs = event.at.as_secs_f64();
        let line = match &event.transition {
            Transition::Injected { location, .. } => {
                format!("T+{:>7.1}s >> DIVERGENCE_DETECTED: {}", secs, location)
            }
            Transition::Healed => format!("T+{:>7.1}s >> SYSTEM_INTEGRITY_RESTORED", secs),
            Transition::Resolved => format!("T+{:>7.1}s >> MANUAL_OVERRIDE: ANOMALY_PURGED", secs),
            Transition::Advanced { .. } | Transition::Ignored => return,
        };
        push_bounded(&mut self.events, line, EVENT_LEN);
    }

    pub fn render(&self, stats: &SystemStats) -> String {
        let active = stats.anomaly_active;
        let mut out = Vec::new();

        out.push(section("SYSTEM CORE STATUS"));
        if active {
            out.push(format!(
                "  {}  {}",
                "RESTORING".red().bold(),
                "AUTONOMOUS SELF-HEALING ACTIVE".red()
            ));
            out.push(format!(
                "  {}  {}",
                format!("DIVERGENCE: {}", stats.anomaly_location).red(),
                format!("{}% COMPLETE", stats.anomaly_progress).red().bold()
            ));
            out.push(format!("  {}", bar(stats.anomaly_progress as f64, 40, true)));
            out.push(format!(
                "  {}",
                "JARVIS ENGAGING COUNTER-MEASURES... REDIRECTING POWER GRID...".red().dimmed()
            ));
            out.push(format!("  {}", "[/resolve] FORCE RESOLUTION".yellow()));
        } else {
            out.push(format!(
                "  {}  {}",
                "100%".cyan().bold(),
                "EFFICIENCY NOMINAL".cyan().dimmed()
            ));
        }
        out.push(format!(
            "  MEMORY ALLOCATION {}   NEURAL NETWORK {}",
            "12.4 TB".cyan(),
            if active {
                "RECALIBRATING".red()
            } else {
                "STABLE".green()
            }
        ));
        out.push(String::new());

        let cpu: Vec<f64> = self.cpu.iter().copied().collect();
        let network: Vec<f64> = self.network.iter().copied().collect();
        let cpu_trend = sparkline(&cpu, CPU_BOUNDS.0, CPU_BOUNDS.1);
        let net_trend = sparkline(&network, NETWORK_BOUNDS.0, NETWORK_BOUNDS.1);
        out.push(section("CPU LOAD"));
        out.push(format!("  {:>6.1} GHZ  {}", stats.cpu, tint(&cpu_trend, active)));
        out.push(section("NETWORK LINK"));
        out.push(format!("  {:>6.0} TB/S {}", stats.network, tint(&net_trend, active)));
        out.push(format!("  MEMORY {:>5.1}%", stats.memory));
        out.push(String::new());

        out.push(format!(
            "{}  {}",
            section("THREAT ASSESSMENT"),
            if active {
                "HEALING IN PROGRESS".red().bold()
            } else {
                "NO IMMEDIATE DANGER".green()
            }
        ));
        for (name, height) in threat_bars(stats, &mut rand::thread_rng()) {
            let alert = active && name == "CYBER";
            out.push(format!("  {:<10} {} {:>3.0}%", name, bar(height, 24, alert), height));
        }
        out.push(String::new());

        out.push(section("LOG_FILE: EVENT_STREAM"));
        let now = chrono::Local::now().format("%H:%M:%S");
        if active {
            out.push(format!(
                "  [{}] >> {}",
                now,
                format!("SELF_HEALING_PROTOCOL_ENGAGED: {}", stats.anomaly_location).red()
            ));
        } else {
            out.push(format!(
                "  [{}] >> {}",
                now,
                "SYSTEM_INTEGRITY_RESTORED: NOMINAL".green()
            ));
        }
        for line in self.events.iter().rev() {
            out.push(format!("  {}", line.bright_black()));
        }
        out.push(format!("  [12:04:31] >> {}", "SECURE_SHELL_ESTABLISHED".bright_black()));
        out.push(format!("  [12:04:45] >> {}", "SATELLITE_UPLINK_SYNC: 100%".bright_black()));

        out.join("\n")
    }
}

fn tint(text: &str, alert: bool) -> ColoredString {
    if alert {
        text.red()
    } else {
        text.cyan()
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, cap: usize) {
    if buf.len() == cap {
        buf.pop_front();
    }
    buf.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    #[test]
    fn test_history_is_bounded() {
        let mut panel = DashboardPanel::new();
        let mut stats = SystemStats::initial();
        for i in 0..50 {
            stats.cpu = 10.0 + i as f64;
            panel.record(&stats);
        }
        assert_eq!(panel.history_len(), HISTORY_LEN);
        assert_eq!(panel.cpu.front(), Some(&40.0));
    }

    #[test]
    fn test_cyber_pinned_while_active() {
        let mut rng = StdRng::seed_from_u64(5);
        let bars = threat_bars(&SystemStats::initial(), &mut rng);
        assert_eq!(bars[1], ("CYBER", 85.0));
        for (_, height) in threat_bars(&SystemStats::nominal(), &mut rng) {
            assert!((20.0..50.0).contains(&height));
        }
    }

    #[test]
    fn test_render_overlay() {
        let panel = DashboardPanel::new();
        let mut stats = SystemStats::initial();
        stats.anomaly_progress = 46;
        let text = panel.render(&stats);
        assert!(text.contains("RESTORING"));
        assert!(text.contains("DIVERGENCE: GRID_SUBSTATION_4"));
        assert!(text.contains("46% COMPLETE"));

        let text = panel.render(&SystemStats::nominal());
        assert!(text.contains("EFFICIENCY NOMINAL"));
        assert!(!text.contains("DIVERGENCE"));
    }

    #[test]
    fn test_event_stream_skips_progress() {
        let mut panel = DashboardPanel::new();
        panel.push_event(&HeartEvent {
            at: Duration::from_millis(7_650),
            transition: Transition::Healed,
        });
        panel.push_event(&HeartEvent {
            at: Duration::from_millis(7_800),
            transition: Transition::Advanced { progress: 2 },
        });
        assert_eq!(panel.events.len(), 1);
        assert!(panel.events[0].contains("SYSTEM_INTEGRITY_RESTORED"));
    }
}
