//! ═══════════════════════════════════════════════════════════════════════════════
//! HEART — Core Timing Loop
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! One task owns the simulator. It sleeps until the next timer deadline or the
//! next command, whichever comes first, runs the callback to completion and
//! publishes a fresh snapshot. Nothing else touches the stats, so no locks.
//!
//! ```text
//!   HeartHandle ──cmd──▶ [ mpsc ] ──▶ pace loop ──▶ [ watch ] ──▶ panels
//!                                       │  ▲
//!                                sleep_until(next deadline)
//! ```
//!
//! The loop ends on `Shutdown` or when every handle is gone. Either way the
//! simulator is stopped (all timers disarmed) before it is handed back.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::anomaly::Transition;
use crate::clock::{Clock, TokioClock};
use crate::error::{JarvisError, JarvisResult};
use crate::simulator::{Simulator, Step};
use crate::stats::SystemStats;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartCommand {
    Resolve,
    Trigger,
    Shutdown,
}

/// A lifecycle transition that changed what the operator sees
#[derive(Debug, Clone, PartialEq)]
pub struct HeartEvent {
    /// Offset from ignition
    pub at: Duration,
    pub transition: Transition,
}

pub struct HeartHandle<R: Rng = StdRng> {
    commands: mpsc::UnboundedSender<HeartCommand>,
    stats: watch::Receiver<SystemStats>,
    events: broadcast::Sender<HeartEvent>,
    task: JoinHandle<Simulator<R>>,
}

impl<R: Rng> HeartHandle<R> {
    /// Heal the current anomaly now. False once the heart has stopped.
    pub fn resolve_anomaly(&self) -> bool {
        self.commands.send(HeartCommand::Resolve).is_ok()
    }

    /// Inject a fresh anomaly now. False once the heart has stopped.
    pub fn trigger_new_anomaly(&self) -> bool {
        self.commands.send(HeartCommand::Trigger).is_ok()
    }

    /// Latest published stats
    pub fn snapshot(&self) -> SystemStats {
        self.stats.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SystemStats> {
        self.stats.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<HeartEvent> {
        self.events.subscribe()
    }

    /// Stop the loop and take the (stopped) simulator back
    pub async fn shutdown(self) -> JarvisResult<Simulator<R>> {
        let _ = self.commands.send(HeartCommand::Shutdown);
        self.task
            .await
            .map_err(|e| JarvisError::Internal(format!("heart task failed: {}", e)))
    }
}

/// Start the simulator on the current runtime
pub fn ignite<R>(sim: Simulator<R>) -> HeartHandle<R>
where
    R: Rng + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (stats_tx, stats_rx) = watch::channel(sim.snapshot());
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let task = tokio::spawn(pace(sim, TokioClock::start(), cmd_rx, stats_tx, event_tx.clone()));

    HeartHandle {
        commands: cmd_tx,
        stats: stats_rx,
        events: event_tx,
        task,
    }
}

async fn pace<R: Rng>(
    mut sim: Simulator<R>,
    clock: TokioClock,
    mut commands: mpsc::UnboundedReceiver<HeartCommand>,
    stats: watch::Sender<SystemStats>,
    events: broadcast::Sender<HeartEvent>,
) -> Simulator<R> {
    info!("[HEART] igniting simulator");
    sim.start(clock.now());
    stats.send_replace(sim.snapshot());

    loop {
        let deadline = sim.next_deadline().map(|d| clock.instant_at(d));

        tokio::select! {
            command = commands.recv() => {
                let now = clock.now();
                let transition = match command {
                    Some(HeartCommand::Resolve) => sim.resolve_anomaly(now),
                    Some(HeartCommand::Trigger) => sim.trigger_new_anomaly(now),
                    Some(HeartCommand::Shutdown) | None => break,
                };
                report(&events, now, transition);
            }
            _ = sleep_until(deadline) => {
                for step in sim.advance(clock.now()) {
                    match step {
                        Step::Telemetry { at } => trace!(?at, "telemetry tick"),
                        Step::Anomaly { at, transition } => report(&events, at, transition),
                    }
                }
            }
        }

        stats.send_replace(sim.snapshot());
    }

    sim.stop();
    stats.send_replace(sim.snapshot());
    info!("[HEART] stopped");
    sim
}

fn report(events: &broadcast::Sender<HeartEvent>, at: Duration, transition: Transition) {
    match &transition {
        Transition::Injected {
            location,
            restarted,
        } => info!(%location, restarted, "anomaly injected"),
        Transition::Healed => info!("anomaly healed"),
        Transition::Resolved => info!("anomaly resolved by override"),
        Transition::Advanced { progress } => {
            debug!(progress, "healing");
            return;
        }
        Transition::Ignored => return,
    }
    // No subscribers is fine
    let _ = events.send(HeartEvent { at, transition });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulationConfig;
    use crate::stats::ThreatLevel;

    fn sim() -> Simulator {
        Simulator::seeded(SimulationConfig::default(), 7)
    }

    #[tokio::test(start_paused = true)]
    async fn test_heals_initial_anomaly() {
        let heart = ignite(sim());
        tokio::time::sleep(Duration::from_millis(3_000)).await;
        let mid = heart.snapshot();
        assert!(mid.anomaly_active);
        assert!(mid.anomaly_progress >= 38);

        tokio::time::sleep(Duration::from_millis(4_700)).await;
        let done = heart.snapshot();
        assert!(!done.anomaly_active);
        assert_eq!(done.threat_level, ThreatLevel::Minimal);
        assert_eq!(done.anomaly_progress, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_command() {
        let heart = ignite(sim());
        let mut events = heart.subscribe_events();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(heart.resolve_anomaly());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!heart.snapshot().anomaly_active);
        let event = events.recv().await.unwrap();
        assert_eq!(event.transition, Transition::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_stopped_simulator() {
        let heart = ignite(sim());
        tokio::time::sleep(Duration::from_millis(200)).await;
        let sim = heart.shutdown().await.unwrap();
        assert!(!sim.is_running());
        assert_eq!(sim.timers().armed_count(), 0);
    }
}
