//! ═══════════════════════════════════════════════════════════════════════════════
//! CLOCK — Ticking-Clock Port and Timer Table
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Time is a `Duration` since an origin chosen by the clock. The simulator only
//! ever sees these offsets, so tests drive it with a `ManualClock` and the live
//! HUD drives it with a `TokioClock`.
//!
//! `Timers` keeps at most one armed slot per `TimerKind`. Arming a kind that is
//! already armed replaces the previous deadline, so a callback can never fire
//! twice for one arming.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Source of monotonic time offsets
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Hand-advanced clock for deterministic runs
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) -> Duration {
        let ms = by.as_millis() as u64;
        Duration::from_millis(self.now_ms.fetch_add(ms, Ordering::SeqCst) + ms)
    }

    pub fn set(&self, at: Duration) {
        self.now_ms.store(at.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

/// Clock backed by tokio's timer (honours paused time in tests)
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn start() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }

    /// Absolute instant for an offset
    pub fn instant_at(&self, offset: Duration) -> tokio::time::Instant {
        self.origin + offset
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        tokio::time::Instant::now().saturating_duration_since(self.origin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Telemetry perturbation (periodic)
    Telemetry,
    /// Idle dwell before the next anomaly (one-shot)
    AnomalyDwell,
    /// Healing progress (periodic)
    AnomalyTick,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [
        TimerKind::Telemetry,
        TimerKind::AnomalyDwell,
        TimerKind::AnomalyTick,
    ];

    fn slot(self) -> usize {
        match self {
            TimerKind::Telemetry => 0,
            TimerKind::AnomalyDwell => 1,
            TimerKind::AnomalyTick => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    deadline: Duration,
    period: Option<Duration>,
}

/// A fired timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub kind: TimerKind,
    pub deadline: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    slots: [Option<Slot>; 3],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once at `now + delay`
    pub fn arm_once(&mut self, kind: TimerKind, now: Duration, delay: Duration) {
        self.slots[kind.slot()] = Some(Slot {
            deadline: now + delay,
            period: None,
        });
    }

    /// Fire every `period`, first at `now + period`. A zero period is bumped to 1ms.
    pub fn arm_every(&mut self, kind: TimerKind, now: Duration, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.slots[kind.slot()] = Some(Slot {
            deadline: now + period,
            period: Some(period),
        });
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        self.slots[kind.slot()] = None;
    }

    pub fn disarm_all(&mut self) {
        self.slots = [None; 3];
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    pub fn armed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Duration> {
        self.slots[kind.slot()].map(|s| s.deadline)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.slots.iter().flatten().map(|s| s.deadline).min()
    }

    /// Pop the earliest timer due at or before `now`. Ties go to the kind
    /// declared first. Periodic timers re-arm from their own deadline.
    pub fn pop_due(&mut self, now: Duration) -> Option<Due> {
        let kind = TimerKind::ALL
            .iter()
            .copied()
            .filter_map(|k| self.slots[k.slot()].map(|s| (k, s.deadline)))
            .filter(|(_, deadline)| *deadline <= now)
            .min_by_key(|(k, deadline)| (*deadline, k.slot()))
            .map(|(k, _)| k)?;

        let slot = self.slots[kind.slot()].as_mut()?;
        let deadline = slot.deadline;
        match slot.period {
            Some(period) => slot.deadline = deadline + period,
            None => self.slots[kind.slot()] = None,
        }
        Some(Due { kind, deadline })
    }
}
