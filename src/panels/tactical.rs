//! Tactical: suit capability profile, subsystem energy load, mission log.

use colored::*;

use crate::display::{bar, section};
use crate::stats::SystemStats;

/// Scale of the capability profile
pub const FULL_MARK: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capability {
    pub name: &'static str,
    pub value: f64,
}

pub fn capability_profile(stats: &SystemStats) -> [Capability; 6] {
    let defense = if stats.anomaly_active { 80.0 } else { 120.0 };
    [
        Capability { name: "DEFENSE", value: defense },
        Capability { name: "SPEED", value: 98.0 + stats.network / 100.0 },
        Capability { name: "POWER", value: 146.0 - stats.cpu / 5.0 },
        Capability { name: "INTELLIGENCE", value: 130.0 },
        Capability { name: "STEALTH", value: 85.0 },
        Capability { name: "STAMINA", value: 110.0 },
    ]
}

/// Percent load per subsystem
pub fn energy_load(stats: &SystemStats) -> [(&'static str, f64); 4] {
    [
        ("CPU", stats.cpu),
        ("MEM", stats.memory),
        ("NET", (stats.network / 2.0).min(100.0)),
        ("ARC", 100.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionEntry {
    pub time: String,
    pub event: &'static str,
    pub status: &'static str,
}

pub fn mission_log(stats: &SystemStats) -> Vec<MissionEntry> {
    let (event, status) = if stats.anomaly_active {
        ("THREAT_REMEDIATION_ENGAGED", "ACTIVE")
    } else {
        ("SYSTEM_STABILITY_NOMINAL", "COMPLETE")
    };
    vec![
        MissionEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            event,
            status,
        },
        MissionEntry { time: "12:10:05".to_string(), event: "DEPLOYING_IRON_LEGION", status: "SUCCESS" },
        MissionEntry { time: "12:11:42".to_string(), event: "HULKBUSTER_STATUS_READY", status: "PENDING" },
        MissionEntry { time: "12:15:11".to_string(), event: "AVENGERS_REASSEMBLE_SIGNAL", status: "ACTIVE" },
    ]
}

fn status_color(status: &str) -> Color {
    match status {
        "SUCCESS" | "COMPLETE" => Color::Green,
        "PENDING" => Color::Yellow,
        _ => Color::Cyan,
    }
}

pub fn render(stats: &SystemStats) -> String {
    let mut out = vec![section("MARK_VII_CAPABILITIES")];
    for cap in capability_profile(stats) {
        out.push(format!(
            "  {:<13} {} {:>6.1}",
            cap.name,
            bar(cap.value / FULL_MARK * 100.0, 30, false),
            cap.value
        ));
    }
    out.push(String::new());
    out.push(section("SUBSYSTEM_ENERGY_LOAD"));
    for (name, load) in energy_load(stats) {
        out.push(format!("  {:<13} {} {:>5.1}%", name, bar(load, 30, false), load));
    }
    out.push(String::new());
    out.push(section("MISSION LOG"));
    out.push(format!(
        "  {:<10} {:<30} {:>8}",
        "TIMESTAMP".bright_black(),
        "OPERATIONAL EVENT".bright_black(),
        "STATUS".bright_black()
    ));
    for entry in mission_log(stats) {
        out.push(format!(
            "  {:<10} {:<30} {:>8}",
            entry.time.cyan(),
            entry.event,
            entry.status.color(status_color(entry.status))
        ));
    }
    out.join("\n")
}
