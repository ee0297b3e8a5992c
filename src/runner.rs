//! ═══════════════════════════════════════════════════════════════════════════════
//! HUD RUNNER — Interactive Command Loop
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The runner never touches the stats directly. It reads snapshots from the
//! heart, sends overrides to it, and drives the panels in between.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::boot::{BootConfig, BootGate, BootSequence, BOOT_LOGS};
use crate::config::{GeoPoint, JarvisConfig};
use crate::display;
use crate::error::{JarvisResult, ValidationError};
use crate::gateway::AiGateway;
use crate::heart::{HeartEvent, HeartHandle};
use crate::panels::{PanelDeck, ScanOutcome};
use crate::simulator::Simulator;
use crate::views::{ViewRouter, ViewType};

/// A parsed line of operator input
#[derive(Debug, Clone, PartialEq)]
pub enum HudCommand {
    View(ViewType),
    Resolve,
    Inject,
    Voice,
    Capture(PathBuf),
    Scan(Option<String>),
    Locate(GeoPoint),
    Refresh,
    Help,
    Quit,
    /// Plain text for the assistant
    Say(String),
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidInput {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Parse one input line. Blank input redraws.
pub fn parse_command(input: &str) -> Result<HudCommand, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(HudCommand::Refresh);
    }
    if !input.starts_with('/') {
        return Ok(HudCommand::Say(input.to_string()));
    }

    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "/view" | "/v" => HudCommand::View(rest.parse().unwrap_or_default()),
        "/dashboard" | "/chat" | "/vision" | "/optics" | "/map" | "/geo" | "/tactical"
        | "/settings" | "/config" => HudCommand::View(head.parse().unwrap_or_default()),
        "/resolve" => HudCommand::Resolve,
        "/inject" | "/trigger" => HudCommand::Inject,
        "/voice" => HudCommand::Voice,
        "/capture" => {
            if rest.is_empty() {
                return Err(invalid("capture", "usage: /capture <image>"));
            }
            HudCommand::Capture(PathBuf::from(rest))
        }
        "/scan" => HudCommand::Scan((!rest.is_empty()).then(|| rest.to_string())),
        "/locate" => {
            let mut parts = rest.split_whitespace().map(str::parse::<f64>);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(lat)), Some(Ok(lng)), None) => {
                    let point = GeoPoint::new(lat, lng);
                    if !point.is_valid() {
                        return Err(invalid("locate", format!("({}, {}) is out of range", lat, lng)));
                    }
                    HudCommand::Locate(point)
                }
                _ => return Err(invalid("locate", "usage: /locate <lat> <lng>")),
            }
        }
        "/refresh" | "/r" => HudCommand::Refresh,
        "/help" | "/h" | "/?" => HudCommand::Help,
        "/quit" | "/q" | "/exit" => HudCommand::Quit,
        _ => return Err(invalid("command", format!("unknown command '{}'", head))),
    };
    Ok(command)
}

/// One Ctrl-C listener for the life of the receiver. Presses that land
/// while nobody is waiting stay queued. Must be called inside a runtime.
pub fn listen_for_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt");
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Line reader over stdin, shared by the gate and the loop
pub struct Console {
    lines: Lines<Box<dyn AsyncBufRead + Unpin + Send>>,
    interrupts: mpsc::UnboundedReceiver<()>,
}

impl Console {
    pub fn new() -> Self {
        Self::from_parts(BufReader::new(tokio::io::stdin()), listen_for_interrupts())
    }

    pub fn from_parts(
        reader: impl AsyncBufRead + Unpin + Send + 'static,
        interrupts: mpsc::UnboundedReceiver<()>,
    ) -> Self {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        Self {
            lines: reader.lines(),
            interrupts,
        }
    }

    /// Print `prompt` and wait for a line. `None` on EOF or Ctrl-C.
    pub async fn read_line(&mut self, prompt: &str) -> JarvisResult<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        self.next_line().await
    }

    /// Wait for a line without prompting. A queued interrupt wins. Cancel safe.
    pub async fn next_line(&mut self) -> JarvisResult<Option<String>> {
        tokio::select! {
            biased;
            Some(()) = self.interrupts.recv() => Ok(None),
            line = self.lines.next_line() => Ok(line?),
        }
    }

    /// Resolves on the next Ctrl-C, queued or new. Never resolves once the
    /// listener is gone.
    pub async fn interrupted(&mut self) {
        if self.interrupts.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Boot gate. Prompts for a key when none is configured; false aborts.
pub async fn authorize(config: &mut JarvisConfig, console: &mut Console) -> JarvisResult<bool> {
    if BootGate::check(config.has_api_key()).is_authorized() {
        return Ok(true);
    }
    display::access_denied();
    let prompt = format!("{} ", "EXECUTE CLEARANCE CHECK: API KEY >".red().bold());
    match console.read_line(&prompt).await? {
        Some(key) if !key.trim().is_empty() => {
            config.api_key = key.trim().to_string();
            display::info("Clearance accepted. Persist it with `jarvis config --set-key <KEY>`.");
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Diagnostics sequence with a progress bar
pub async fn boot(config: &BootConfig) {
    if config.skip {
        return;
    }
    println!();
    println!("{}", "INITIALIZING...".bright_white().bold());
    println!("{}", "STARK_INDUSTRIES                      OS_BOOT_V7.2".bright_black());

    let pb = ProgressBar::new(BOOT_LOGS.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {percent:>3}%")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    BootSequence::new(config.clone())
        .run(|progress| {
            let stamp = chrono::Local::now().format("%H:%M:%S");
            pb.println(format!("[{}] {}", stamp, progress.line.cyan()));
            pb.set_position(progress.index as u64);
        })
        .await;

    pb.finish_and_clear();
}

/// Main HUD runner
pub struct HudRunner<G: AiGateway> {
    gateway: G,
    heart: HeartHandle,
    events: broadcast::Receiver<HeartEvent>,
    router: ViewRouter,
    deck: PanelDeck,
    sample_every: Duration,
}

impl<G: AiGateway> HudRunner<G> {
    pub fn new(config: &JarvisConfig, gateway: G, heart: HeartHandle) -> Self {
        let events = heart.subscribe_events();
        Self {
            gateway,
            events,
            heart,
            router: ViewRouter::new(),
            deck: PanelDeck::new(config),
            sample_every: Duration::from_millis(config.simulation.telemetry.interval_ms.max(1)),
        }
    }

    pub fn active_view(&self) -> ViewType {
        self.router.active()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn deck(&self) -> &PanelDeck {
        &self.deck
    }

    pub fn heart(&self) -> &HeartHandle {
        &self.heart
    }

    /// Main command loop. Returns the stopped simulator.
    pub async fn run(mut self, console: &mut Console) -> JarvisResult<Simulator> {
        display::welcome();
        self.sample();
        self.redraw();

        let mut sampler = tokio::time::interval(self.sample_every);
        loop {
            print!("{}", display::prompt(self.router.active()));
            std::io::stdout().flush()?;
            let line = loop {
                tokio::select! {
                    line = console.next_line() => break line?,
                    _ = sampler.tick() => self.sample(),
                }
            };
            let Some(line) = line else {
                break;
            };

            self.drain_events();
            match parse_command(&line) {
                Ok(command) => {
                    let keep = tokio::select! {
                        biased;
                        _ = console.interrupted() => false,
                        keep = self.handle(command) => keep,
                    };
                    if !keep {
                        break;
                    }
                }
                Err(err) => display::error(&format!("{}. Type /help for commands.", err)),
            }
        }

        println!("{}", "J.A.R.V.I.S. OFFLINE.".cyan());
        self.heart.shutdown().await
    }

    /// Apply one command. False means quit.
    pub async fn handle(&mut self, command: HudCommand) -> bool {
        debug!(?command, "hud command");
        match command {
            HudCommand::Quit => return false,
            HudCommand::Help => {
                display::help();
                return true;
            }
            HudCommand::Refresh => {}
            HudCommand::View(view) => {
                self.router.select(view);
            }
            HudCommand::Resolve => {
                if !self.heart.snapshot().anomaly_active {
                    display::info("No active anomaly.");
                }
                self.heart.resolve_anomaly();
                self.settle().await;
            }
            HudCommand::Inject => {
                self.heart.trigger_new_anomaly();
                self.settle().await;
            }
            HudCommand::Voice => {
                let on = self.deck.chat.toggle_voice();
                display::info(&format!("Voice response {}", if on { "ON" } else { "OFF" }));
            }
            HudCommand::Capture(path) => {
                self.router.select(ViewType::Vision);
                display::info("ANALYZING...");
                if let Err(err) = self.deck.vision.capture(&self.gateway, &path).await {
                    display::error(&format!("cannot read frame {}: {}", path.display(), err));
                }
            }
            HudCommand::Scan(query) => {
                self.router.select(ViewType::Map);
                if let Some(query) = query {
                    self.deck.map.set_query(&query);
                }
                display::info("POLLING SATELLITE...");
                match self.deck.map.scan(&self.gateway).await {
                    ScanOutcome::Updated => {}
                    ScanOutcome::NoPosition => {
                        display::warning("No position. Use /locate <lat> <lng> first.")
                    }
                    ScanOutcome::Failed => display::warning("Perimeter scan failed."),
                }
            }
            HudCommand::Locate(point) => {
                self.deck.map.set_position(point);
                self.router.select(ViewType::Map);
            }
            HudCommand::Say(text) => {
                if self.router.active() != ViewType::Chat {
                    display::info("Open 02 COMS LINK (/chat) to talk to the assistant.");
                    return true;
                }
                println!("{}", "Processing data...".bright_black());
                self.deck.chat.send(&self.gateway, &text).await;
                // Text first, then the voice
                self.redraw();
                self.deck.chat.speak_reply(&self.gateway).await;
                return true;
            }
        }
        self.redraw();
        true
    }

    /// Let the heart apply a just-sent command before the next redraw
    async fn settle(&mut self) {
        tokio::task::yield_now().await;
        self.drain_events();
    }

    fn sample(&mut self) {
        self.drain_events();
        self.deck.dashboard.record(&self.heart.snapshot());
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.deck.dashboard.push_event(&event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn redraw(&self) {
        let stats = self.heart.snapshot();
        let view = self.router.active();
        println!();
        display::header(view, &stats);
        display::sidebar(view);
        println!("{}", self.deck.render(view, &stats));
        display::footer(&stats);
    }
}

/// Live view refreshed every `interval` until Ctrl-C. Locked without a key:
/// shows the denial and returns `None` without starting the core.
pub async fn watch(
    config: &JarvisConfig,
    view: ViewType,
    interval: Duration,
) -> JarvisResult<Option<Simulator>> {
    if !BootGate::check(config.has_api_key()).is_authorized() {
        display::access_denied();
        display::info("Set a key with `jarvis config --set-key <KEY>` or GEMINI_API_KEY.");
        return Ok(None);
    }

    let heart = crate::heart::ignite(Simulator::from_config(config.simulation.clone()));
    let mut deck = PanelDeck::new(config);
    let mut events = heart.subscribe_events();
    let mut interrupts = listen_for_interrupts();
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(50)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                while let Ok(event) = events.try_recv() {
                    deck.dashboard.push_event(&event);
                }
                let stats = heart.snapshot();
                deck.dashboard.record(&stats);
                // Clear screen, cursor home
                print!("\x1b[2J\x1b[H");
                display::header(view, &stats);
                display::sidebar(view);
                println!("{}", deck.render(view, &stats));
                display::footer(&stats);
                println!("{}", "Ctrl-C to exit".bright_black());
            }
            Some(()) = interrupts.recv() => break,
        }
    }
    heart.shutdown().await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_views() {
        assert_eq!(parse_command("/chat").unwrap(), HudCommand::View(ViewType::Chat));
        assert_eq!(parse_command("/optics").unwrap(), HudCommand::View(ViewType::Vision));
        assert_eq!(parse_command("/view 5").unwrap(), HudCommand::View(ViewType::Tactical));
        assert_eq!(parse_command("/view nowhere").unwrap(), HudCommand::View(ViewType::Dashboard));
    }

    #[test]
    fn test_parse_overrides() {
        assert_eq!(parse_command("/resolve").unwrap(), HudCommand::Resolve);
        assert_eq!(parse_command(" /INJECT ").unwrap(), HudCommand::Inject);
        assert_eq!(parse_command("").unwrap(), HudCommand::Refresh);
        assert_eq!(parse_command("/q").unwrap(), HudCommand::Quit);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            parse_command("/capture frames/feed 01.jpg").unwrap(),
            HudCommand::Capture(PathBuf::from("frames/feed 01.jpg"))
        );
        assert!(parse_command("/capture").is_err());
        assert_eq!(parse_command("/scan").unwrap(), HudCommand::Scan(None));
        assert_eq!(
            parse_command("/scan fuel depots").unwrap(),
            HudCommand::Scan(Some("fuel depots".to_string()))
        );
        assert_eq!(
            parse_command("/locate 40.7128 -74.006").unwrap(),
            HudCommand::Locate(GeoPoint::new(40.7128, -74.006))
        );
        assert!(parse_command("/locate 40.7").is_err());
        assert!(parse_command("/locate 100 0").is_err());
        assert!(parse_command("/locate a b").is_err());
    }

    #[test]
    fn test_plain_text_and_unknown() {
        assert_eq!(
            parse_command("Run a diagnostic").unwrap(),
            HudCommand::Say("Run a diagnostic".to_string())
        );
        let err = parse_command("/selfdestruct").unwrap_err();
        assert!(err.to_string().contains("/selfdestruct"));
    }

    fn scripted_console(input: &'static str) -> (Console, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Console::from_parts(BufReader::new(input.as_bytes()), rx), tx)
    }

    #[tokio::test]
    async fn test_interrupt_pressed_between_reads_ends_next_read() {
        let (mut console, tx) = scripted_console("/chat\n/quit\n");
        assert_eq!(console.next_line().await.unwrap().as_deref(), Some("/chat"));
        // Pressed while a command was running, not while reading
        tx.send(()).unwrap();
        assert_eq!(console.next_line().await.unwrap(), None);
        assert_eq!(console.next_line().await.unwrap().as_deref(), Some("/quit"));
    }

    #[tokio::test]
    async fn test_lost_listener_keeps_reading() {
        let (mut console, tx) = scripted_console("status\n");
        drop(tx);
        assert_eq!(console.next_line().await.unwrap().as_deref(), Some("status"));
        assert_eq!(console.next_line().await.unwrap(), None);

        let done = tokio::time::timeout(Duration::from_millis(20), console.interrupted()).await;
        assert!(done.is_err());
    }

    #[tokio::test]
    async fn test_queued_interrupt_is_seen_once() {
        let (mut console, tx) = scripted_console("");
        tx.send(()).unwrap();
        console.interrupted().await;
        let again = tokio::time::timeout(Duration::from_millis(20), console.interrupted()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_watch_is_locked_without_key() {
        let config = JarvisConfig::default();
        assert!(!config.has_api_key());
        let sim = tokio::time::timeout(
            Duration::from_secs(5),
            watch(&config, ViewType::Dashboard, Duration::from_millis(100)),
        )
        .await
        .expect("locked watch must return at once")
        .unwrap();
        assert!(sim.is_none());
    }
}
