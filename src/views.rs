//! ═══════════════════════════════════════════════════════════════════════════════
//! VIEWS — View Identifiers and Router
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViewType {
    #[default]
    Dashboard,
    Chat,
    Vision,
    Map,
    Tactical,
    Settings,
}

impl ViewType {
    /// Sidebar order
    pub const ALL: [ViewType; 6] = [
        ViewType::Dashboard,
        ViewType::Chat,
        ViewType::Vision,
        ViewType::Map,
        ViewType::Tactical,
        ViewType::Settings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ViewType::Dashboard => "DASHBOARD",
            ViewType::Chat => "CHAT",
            ViewType::Vision => "VISION",
            ViewType::Map => "MAP",
            ViewType::Tactical => "TACTICAL",
            ViewType::Settings => "SETTINGS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewType::Dashboard => "01 DASHBOARD",
            ViewType::Chat => "02 COMS LINK",
            ViewType::Vision => "03 OPTICS",
            ViewType::Map => "04 GEOLOCATION",
            ViewType::Tactical => "05 TACTICAL",
            ViewType::Settings => "06 CORE CONFIG",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ViewType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_start_matches('/').to_ascii_lowercase();
        let view = match key.as_str() {
            "dashboard" | "dash" | "1" | "01" => ViewType::Dashboard,
            "chat" | "coms" | "comms" | "coms link" | "2" | "02" => ViewType::Chat,
            "vision" | "optics" | "3" | "03" => ViewType::Vision,
            "map" | "geo" | "geolocation" | "4" | "04" => ViewType::Map,
            "tactical" | "5" | "05" => ViewType::Tactical,
            "settings" | "config" | "core config" | "6" | "06" => ViewType::Settings,
            _ => {
                return Err(ValidationError::InvalidInput {
                    field: "view".to_string(),
                    message: format!("unknown view '{}'", s.trim()),
                })
            }
        };
        Ok(view)
    }
}

/// Holds the active view
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    active: ViewType,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ViewType {
        self.active
    }

    pub fn select(&mut self, view: ViewType) -> ViewType {
        self.active = view;
        self.active
    }

    /// Select from user text. Unknown input lands on the dashboard.
    pub fn select_str(&mut self, input: &str) -> ViewType {
        let view = input.parse().unwrap_or_default();
        self.select(view)
    }
}
