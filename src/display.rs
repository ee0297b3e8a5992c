//! ═══════════════════════════════════════════════════════════════════════════════
//! DISPLAY — Terminal Output Formatting
//! ═══════════════════════════════════════════════════════════════════════════════

use colored::*;

use crate::stats::{SystemStats, ThreatLevel};
use crate::views::ViewType;

pub const WIDTH: usize = 72;

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Horizontal gauge for a 0..=100 value
pub fn bar(percent: f64, width: usize, alert: bool) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let fill = "█".repeat(filled);
    format!(
        "[{}{}]",
        if alert { fill.red() } else { fill.cyan() },
        "░".repeat(width.saturating_sub(filled)).bright_black()
    )
}

/// One glyph per sample, scaled into `[lo, hi]`
pub fn sparkline(values: &[f64], lo: f64, hi: f64) -> String {
    let span = (hi - lo).max(f64::EPSILON);
    values
        .iter()
        .map(|v| {
            let t = ((v - lo) / span).clamp(0.0, 1.0);
            SPARK[(t * (SPARK.len() - 1) as f64).round() as usize]
        })
        .collect()
}

pub fn threat_color(level: ThreatLevel) -> Color {
    match level {
        ThreatLevel::Minimal => Color::Green,
        ThreatLevel::Caution => Color::Yellow,
        ThreatLevel::Critical => Color::Red,
    }
}

/// Section title inside a panel
pub fn section(title: &str) -> String {
    format!("{} {}", "▌".cyan(), title.cyan().bold())
}

pub fn rule() -> String {
    "─".repeat(WIDTH).bright_black().to_string()
}

/// Display welcome banner
pub fn welcome() {
    println!();
    println!("{}", "═".repeat(WIDTH).cyan());
    println!("{}", "  J.A.R.V.I.S. — CORE SYSTEM ONLINE".bright_white().bold());
    println!("{}", "═".repeat(WIDTH).cyan());
    println!();
    println!(
        "Commands: {} {} {} {} {}",
        "/view".yellow(),
        "/resolve".yellow(),
        "/inject".yellow(),
        "/help".yellow(),
        "/quit".yellow()
    );
    println!();
}

/// Title row: active view, system load, clock
pub fn header(view: ViewType, stats: &SystemStats) {
    let now = chrono::Local::now();
    println!("{}", "═".repeat(WIDTH).cyan());
    println!(
        "{} {}   {} {} {:>3.0}%   {} {}",
        "SYSTEM OVERVIEW /".bright_black(),
        view.id().bright_white().bold(),
        "SYSTEM LOAD".bright_black(),
        bar(stats.cpu, 12, false),
        stats.cpu,
        "SOL".bright_black(),
        now.format("%H:%M:%S %d %b %Y").to_string().to_uppercase().cyan()
    );
}

/// Tab strip with the active view highlighted
pub fn sidebar(active: ViewType) {
    let tabs: Vec<String> = ViewType::ALL
        .iter()
        .map(|v| {
            if *v == active {
                format!("▶ {}", v.label()).black().on_cyan().bold().to_string()
            } else {
                v.label().cyan().dimmed().to_string()
            }
        })
        .collect();
    println!("{}", tabs.join("  "));
    println!("{}", rule());
}

pub fn footer(stats: &SystemStats) {
    println!("{}", rule());
    println!(
        "{}   {}   {}   {}",
        "UPLINK: ENCRYPTED".bright_black(),
        "OS: MARK_VII_REVISION_4".bright_black(),
        format!("STATUS: {}", stats.threat_level)
            .color(threat_color(stats.threat_level))
            .bold(),
        "STARK_INDUSTRIES © 2025".bright_black()
    );
}

/// Lock screen shown when no key is configured
pub fn access_denied() {
    println!();
    println!("{}", "╔══════════════════════════════════════════╗".red());
    println!("{}", "║              ACCESS_DENIED               ║".red().bold());
    println!("{}", "╚══════════════════════════════════════════╝".red());
    println!("{}", "SECURITY CLEARANCE LEVEL 7 REQUIRED".red().dimmed());
    println!();
    println!(
        "{}",
        "SYSTEM \"J.A.R.V.I.S.\" IS LOCKED. TO INITIALIZE NEURAL LINK, PROVIDE A VALID GOOGLE GEMINI API KEY."
            .red()
    );
    println!(
        "{}",
        "BILLING DOCUMENTATION: https://ai.google.dev/gemini-api/docs/billing".bright_black()
    );
    println!();
}

/// Display warning message
pub fn warning(message: &str) {
    println!();
    println!("{} {}", "WARNING:".yellow().bold(), message.yellow());
}

/// Display error
pub fn error(message: &str) {
    println!();
    println!("{} {}", "ERROR:".red().bold(), message.red());
}

pub fn info(message: &str) {
    println!("{} {}", ">>".cyan(), message);
}

/// Display help
pub fn help() {
    println!();
    println!("{}", "═══ COMMANDS ═══".cyan().bold());
    println!();
    println!("  {}  Switch view (1-6, name or alias)", "/view <id>".yellow());
    println!(
        "  {}  Jump to a view",
        "/dashboard /chat /vision /map /tactical /settings".yellow()
    );
    println!("  {}    Heal the active anomaly now", "/resolve".yellow());
    println!("  {}     Inject a new anomaly", "/inject".yellow());
    println!("  {}      Toggle spoken replies", "/voice".yellow());
    println!("  {}  Analyze an image file", "/capture <path>".yellow());
    println!("  {}  Scan the perimeter", "/scan [query]".yellow());
    println!("  {}  Set map position", "/locate <lat> <lng>".yellow());
    println!("  {}    Redraw the current view", "/refresh".yellow());
    println!("  {}       Show this help", "/help".yellow());
    println!("  {}       Exit", "/quit".yellow());
    println!();
    println!("  In {} plain text is sent to the assistant.", "02 COMS LINK".cyan());
    println!();
}

/// Display prompt
pub fn prompt(view: ViewType) -> String {
    format!("{} ", format!("{} >", view.id()).cyan().bold())
}
