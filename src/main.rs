//! ═══════════════════════════════════════════════════════════════════════════════
//! J.A.R.V.I.S. CLI — Heads-Up Display
//! ═══════════════════════════════════════════════════════════════════════════════
//! Single binary, subcommand dispatch. No subcommand boots the interactive HUD.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use jarvis::clock::{Clock, ManualClock};
use jarvis::config::{GeoPoint, JarvisConfig};
use jarvis::display;
use jarvis::gateway::GeminiClient;
use jarvis::heart;
use jarvis::panels::settings::mask_key;
use jarvis::panels::{ChatPanel, MapPanel, ScanOutcome, VisionPanel};
use jarvis::runner::{self, Console, HudRunner};
use jarvis::simulator::{SimulationConfig, Simulator, Step};
use jarvis::views::ViewType;
use jarvis::Transition;

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(about = "J.A.R.V.I.S. heads-up display")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the interactive HUD (default)
    Hud,

    /// Live-refresh one view until Ctrl-C
    Watch {
        /// View id, name or alias
        #[arg(long, default_value = "dashboard")]
        view: String,

        /// Refresh period in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },

    /// Run the core headless on a manual clock
    Simulate {
        /// Simulated seconds to run
        #[arg(short, long, default_value = "120")]
        seconds: u64,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Send a single message to the assistant
    Chat {
        /// Message to send
        message: String,
    },

    /// Analyze one image frame
    Vision {
        /// Image file (jpeg, png, webp, gif)
        image: PathBuf,

        /// Override the analysis prompt
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Grounded perimeter scan around a position
    Map {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// What to look for
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show/set configuration
    Config {
        /// Show current config
        #[arg(long)]
        show: bool,

        /// Set API key (saved to config file)
        #[arg(long)]
        set_key: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "jarvis=debug" } else { "jarvis=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match JarvisConfig::load() {
        Ok(config) => config,
        Err(e) => {
            display::warning(&format!("Ignoring unreadable config file: {}", e));
            JarvisConfig::from_env()
        }
    };
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Hud) {
        Commands::Hud => hud(config).await?,

        Commands::Watch { view, interval_ms } => {
            let view: ViewType = view.parse()?;
            let interval = Duration::from_millis(interval_ms);
            if let Some(sim) = runner::watch(&config, view, interval).await? {
                debug!(armed = sim.timers().armed_count(), "heart stopped");
            }
        }

        Commands::Simulate { seconds, seed } => {
            simulate(config.simulation, seconds, seed)?;
        }

        Commands::Chat { message } => {
            let gateway = gateway(&config)?;
            let mut chat = ChatPanel::new(config.voice_enabled);
            if let Some(reply) = chat.send(&gateway, &message).await {
                println!("{}", reply.content);
            }
            chat.speak_reply(&gateway).await;
        }

        Commands::Vision { image, prompt } => {
            let gateway = gateway(&config)?;
            let mut vision = VisionPanel::new().with_prompt(prompt.as_deref().unwrap_or(""));
            let analysis = vision
                .capture(&gateway, &image)
                .await
                .with_context(|| format!("cannot read {}", image.display()))?;
            println!("{}", analysis);
        }

        Commands::Map { lat, lng, query } => {
            let point = GeoPoint::new(lat, lng);
            if !point.is_valid() {
                anyhow::bail!("({}, {}) is not a valid position", lat, lng);
            }
            let gateway = gateway(&config)?;
            let mut map = MapPanel::new(Some(point));
            if let Some(query) = query {
                map.set_query(&query);
            }
            if map.scan(&gateway).await == ScanOutcome::Failed {
                display::error("Perimeter scan failed.");
            }
            println!("{}", map.render());
        }

        Commands::Config { show, set_key } => {
            if show {
                println!("Current configuration:");
                println!("  API key: {}", mask_key(&config.api_key));
                println!("  API base: {}", config.api_base);
                println!("  Timeout: {}s", config.timeout_secs);
                println!("  Chat model: {}", config.models.chat);
                println!("  Speech model: {} ({})", config.models.speech, config.models.voice);
                println!("  Vision model: {}", config.models.vision);
                println!("  Maps model: {}", config.models.maps);
                println!("  Persona: {}", config.persona);
                println!("  Voice: {}", if config.voice_enabled { "on" } else { "off" });
                println!("  Audio dir: {}", config.audio_dir_or_default().display());
                println!();
                println!("Simulation:");
                println!("  Telemetry interval: {}ms", config.simulation.telemetry.interval_ms);
                println!(
                    "  Anomaly dwell: {}-{}ms",
                    config.simulation.anomaly.dwell_min_ms, config.simulation.anomaly.dwell_max_ms
                );
                println!(
                    "  Healing: +{} every {}ms",
                    config.simulation.anomaly.progress_step, config.simulation.anomaly.tick_ms
                );
                println!();
                println!("Config file: {}", JarvisConfig::config_path().display());
            }

            if let Some(key) = set_key {
                config.api_key = key.trim().to_string();
                let path = config.save()?;
                println!("API key saved to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Gemini client that warns when the key is rejected
fn gateway(config: &JarvisConfig) -> Result<GeminiClient> {
    Ok(GeminiClient::new(config)?.with_rejection_hook(|| {
        display::warning("API key rejected. Select a new one with `jarvis config --set-key <KEY>`.")
    }))
}

async fn hud(mut config: JarvisConfig) -> Result<()> {
    let mut console = Console::new();
    if !runner::authorize(&mut config, &mut console).await? {
        display::error("ACCESS DENIED. Shutting down.");
        return Ok(());
    }

    runner::boot(&config.boot).await;

    let gateway = gateway(&config)?;
    let heart = heart::ignite(Simulator::from_config(config.simulation.clone()));
    let sim = HudRunner::new(&config, gateway, heart).run(&mut console).await?;

    debug!(armed = sim.timers().armed_count(), "heart stopped");
    Ok(())
}

/// Headless run: step the core deadline by deadline and check invariants
fn simulate(config: SimulationConfig, seconds: u64, seed: Option<u64>) -> Result<()> {
    let clock = ManualClock::new();
    let mut sim = match seed.or(config.seed) {
        Some(seed) => Simulator::seeded(config, seed),
        None => Simulator::from_config(config),
    };
    let end = Duration::from_secs(seconds);

    sim.start(clock.now());
    sim.stats().validate()?;
    info!(seconds, "simulation started");

    let (mut telemetry, mut injected, mut healed) = (0usize, 0usize, 0usize);
    while let Some(deadline) = sim.next_deadline() {
        if deadline > end {
            break;
        }
        clock.set(deadline);
        for step in sim.advance(clock.now()) {
            match step {
                Step::Telemetry { .. } => telemetry += 1,
                Step::Anomaly { at, transition } => {
                    let stamp = format!("[{:>9.3}s]", at.as_secs_f64()).bright_black();
                    match transition {
                        Transition::Injected { location, restarted } => {
                            injected += 1;
                            let note = if restarted { " (restarted)" } else { "" };
                            println!("{} {} {}{}", stamp, "ANOMALY".red().bold(), location, note);
                        }
                        Transition::Healed => {
                            healed += 1;
                            println!("{} {}", stamp, "HEALED".green().bold());
                        }
                        Transition::Resolved => println!("{} {}", stamp, "RESOLVED".green()),
                        Transition::Advanced { progress } => debug!(progress, "healing"),
                        Transition::Ignored => {}
                    }
                }
            }
        }
        sim.stats()
            .validate()
            .with_context(|| format!("invariant broken at {:?}", clock.now()))?;
    }

    sim.stop();
    let stats = sim.stats();
    println!();
    println!(
        "{} {}s simulated: {} telemetry ticks, {} anomalies, {} healed",
        "DONE".cyan().bold(),
        seconds,
        telemetry,
        injected,
        healed
    );
    println!(
        "  THREAT {}  CPU {:.1}%  MEM {:.1}%  NET {:.0} TB/s  PROGRESS {}%",
        stats.threat_level, stats.cpu, stats.memory, stats.network, stats.anomaly_progress
    );
    Ok(())
}
