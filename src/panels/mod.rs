//! ═══════════════════════════════════════════════════════════════════════════════
//! PANELS — The Six HUD Views
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Panels read stats snapshots and never mutate them. The dashboard's only way
//! to act on the core is the resolve override, which goes through the heart.
//! ═══════════════════════════════════════════════════════════════════════════════

pub mod chat;
pub mod dashboard;
pub mod map;
pub mod settings;
pub mod tactical;
pub mod vision;

pub use chat::{ChatMessage, ChatPanel};
pub use dashboard::DashboardPanel;
pub use map::{MapPanel, ScanOutcome};
pub use vision::VisionPanel;

use crate::config::JarvisConfig;
use crate::stats::SystemStats;
use crate::views::ViewType;

/// Panel state that outlives a view switch
#[derive(Debug, Clone)]
pub struct PanelDeck {
    pub dashboard: DashboardPanel,
    pub chat: ChatPanel,
    pub vision: VisionPanel,
    pub map: MapPanel,
    config: JarvisConfig,
}

impl PanelDeck {
    pub fn new(config: &JarvisConfig) -> Self {
        Self {
            dashboard: DashboardPanel::new(),
            chat: ChatPanel::new(config.voice_enabled),
            vision: VisionPanel::new(),
            map: MapPanel::new(config.location),
            config: config.clone(),
        }
    }

    pub fn render(&self, view: ViewType, stats: &SystemStats) -> String {
        match view {
            ViewType::Dashboard => self.dashboard.render(stats),
            ViewType::Chat => self.chat.render(),
            ViewType::Vision => self.vision.render(),
            ViewType::Map => self.map.render(),
            ViewType::Tactical => tactical::render(stats),
            ViewType::Settings => settings::render(&self.config),
        }
    }
}
