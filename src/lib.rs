//! ═══════════════════════════════════════════════════════════════════════════════
//! J.A.R.V.I.S. — Heads-Up Display Library
//! ═══════════════════════════════════════════════════════════════════════════════
//! One simulated core, six panels, one AI gateway. The heart owns the stats;
//! everything else reads snapshots.
//! ═══════════════════════════════════════════════════════════════════════════════

#![allow(clippy::new_without_default)]

// ═══════════════════════════════════════════════════════════════════════════════
// CORE — stats, lifecycle, timers
// ═══════════════════════════════════════════════════════════════════════════════

pub mod anomaly;
pub mod clock;
pub mod error;
pub mod heart;
pub mod simulator;
pub mod stats;
pub mod telemetry;

// ═══════════════════════════════════════════════════════════════════════════════
// SHELL — boot, views, panels, operator loop
// ═══════════════════════════════════════════════════════════════════════════════

pub mod boot;
pub mod config;
pub mod display;
pub mod panels;
pub mod runner;
pub mod views;

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY — generative model access
// ═══════════════════════════════════════════════════════════════════════════════

pub mod gateway;

pub use anomaly::{AnomalyConfig, AnomalyEvent, AnomalyLifecycle, AnomalyPhase, Transition};
pub use clock::{Clock, ManualClock, TimerKind, Timers, TokioClock};
pub use config::{GeoPoint, JarvisConfig};
pub use error::{ConfigError, GatewayError, JarvisError, JarvisResult, ValidationError};
pub use gateway::{AiGateway, GeminiClient};
pub use heart::{ignite, HeartEvent, HeartHandle};
pub use runner::{HudCommand, HudRunner};
pub use simulator::{SimulationConfig, Simulator, Step};
pub use stats::{SystemStats, ThreatLevel};
pub use views::{ViewRouter, ViewType};
