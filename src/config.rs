//! ═══════════════════════════════════════════════════════════════════════════════
//! CONFIG — HUD Settings
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Layering: defaults ← `<config_dir>/jarvis/config.json` ← environment.
//! Every field in the file is optional.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::boot::BootConfig;
use crate::error::{ConfigError, JarvisResult};
use crate::simulator::SimulationConfig;
use crate::telemetry::Perturbation;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are JARVIS, a sophisticated AI developed by Stark Industries. Be helpful, formal yet witty, and concise. Use tech jargon occasionally. You are currently running in a terminal HUD interface.";

/// Environment variables consulted for the key, first hit wins
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];
pub const API_BASE_VAR: &str = "JARVIS_API_BASE";

/// Model names per gateway operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub chat: String,
    pub speech: String,
    pub vision: String,
    pub maps: String,
    /// Prebuilt TTS voice
    pub voice: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat: "gemini-3-flash-preview".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
            vision: "gemini-2.5-flash-image".to_string(),
            maps: "gemini-2.5-flash".to_string(),
            voice: "Puck".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Persona {
    #[default]
    Jarvis,
    Friday,
    Edith,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Jarvis, Persona::Friday, Persona::Edith];

    pub fn name(&self) -> &'static str {
        match self {
            Persona::Jarvis => "JARVIS",
            Persona::Friday => "FRIDAY",
            Persona::Edith => "EDITH",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Main HUD configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JarvisConfig {
    /// Gemini API key
    pub api_key: String,

    /// Base URL of the Generative Language API
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub models: ModelConfig,

    /// Personality matrix shown in CORE CONFIG
    pub persona: Persona,

    /// System instruction for chat replies
    pub system_instruction: String,

    /// Speak assistant replies
    pub voice_enabled: bool,

    /// Where synthesized speech is written (none = `default_audio_dir`)
    pub audio_dir: Option<PathBuf>,

    /// Position used by the geolocation panel
    pub location: Option<GeoPoint>,

    /// SYSTEM_ALERT_THROTTLE slider, 0..=100
    pub alert_throttle: u8,

    pub boot: BootConfig,

    pub simulation: SimulationConfig,
}

impl Default for JarvisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 60,
            models: ModelConfig::default(),
            persona: Persona::default(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            voice_enabled: true,
            audio_dir: None,
            location: None,
            alert_throttle: 50,
            boot: BootConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl JarvisConfig {
    /// Load config file (if any) then apply environment overrides
    pub fn load() -> JarvisResult<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Create config from environment only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Read a config file. A missing file is an error here.
    pub fn load_from(path: &Path) -> JarvisResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Overlay environment values; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|name| present(name)) {
            self.api_key = key;
        }
        if let Some(base) = present(API_BASE_VAR) {
            self.api_base = base;
        }
    }

    /// Default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jarvis")
            .join("config.json")
    }

    /// Default directory for synthesized speech
    pub fn default_audio_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jarvis")
            .join("audio")
    }

    /// The directory the WAV sink writes to
    pub fn audio_dir_or_default(&self) -> PathBuf {
        self.audio_dir.clone().unwrap_or_else(Self::default_audio_dir)
    }

    /// Save config to the default path
    pub fn save(&self) -> JarvisResult<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> JarvisResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check if API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Reject settings the simulators or gateway cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: String| ConfigError::InvalidValue {
            field: field.to_string(),
            message,
        };

        let anomaly = &self.simulation.anomaly;
        if anomaly.dwell_min_ms > anomaly.dwell_max_ms {
            return Err(invalid(
                "simulation.anomaly.dwell_min_ms",
                format!(
                    "{} is greater than dwell_max_ms {}",
                    anomaly.dwell_min_ms, anomaly.dwell_max_ms
                ),
            ));
        }
        if anomaly.tick_ms == 0 {
            return Err(invalid("simulation.anomaly.tick_ms", "must be positive".to_string()));
        }
        if anomaly.progress_step == 0 {
            return Err(invalid(
                "simulation.anomaly.progress_step",
                "must be positive".to_string(),
            ));
        }
        if anomaly.locations.is_empty() {
            return Err(ConfigError::MissingField(
                "simulation.anomaly.locations".to_string(),
            ));
        }

        let telemetry = &self.simulation.telemetry;
        if telemetry.interval_ms == 0 {
            return Err(invalid(
                "simulation.telemetry.interval_ms",
                "must be positive".to_string(),
            ));
        }
        let fields: [(&str, &Perturbation); 3] = [
            ("simulation.telemetry.cpu", &telemetry.cpu),
            ("simulation.telemetry.memory", &telemetry.memory),
            ("simulation.telemetry.network", &telemetry.network),
        ];
        for (field, p) in fields {
            if p.lo > p.hi {
                return Err(invalid(field, format!("bounds [{}, {}] are inverted", p.lo, p.hi)));
            }
        }

        if self.alert_throttle > 100 {
            return Err(invalid(
                "alert_throttle",
                format!("{} is outside 0..=100", self.alert_throttle),
            ));
        }
        if let Some(point) = self.location {
            if !point.is_valid() {
                return Err(invalid(
                    "location",
                    format!("({}, {}) is not a coordinate", point.latitude, point.longitude),
                ));
            }
        }
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::MissingField("api_base".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = JarvisConfig::default();
        assert!(!config.has_api_key());
        assert_eq!(config.models.chat, "gemini-3-flash-preview");
        assert_eq!(config.models.voice, "Puck");
        assert_eq!(config.persona, Persona::Jarvis);
        assert!(config.voice_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_audio_dir_falls_back_to_data_dir() {
        let mut config = JarvisConfig::default();
        assert_eq!(config.audio_dir_or_default(), JarvisConfig::default_audio_dir());
        assert!(config.audio_dir_or_default().ends_with("jarvis/audio"));

        config.audio_dir = Some(PathBuf::from("/tmp/jarvis-voice"));
        assert_eq!(config.audio_dir_or_default(), PathBuf::from("/tmp/jarvis-voice"));
    }

    #[test]
    fn test_env_precedence() {
        let mut config = JarvisConfig::default();
        config.apply_env(env(&[("API_KEY", "primary"), ("GEMINI_API_KEY", "secondary")]));
        assert_eq!(config.api_key, "primary");

        let mut config = JarvisConfig::default();
        config.apply_env(env(&[("API_KEY", "  "), ("GEMINI_API_KEY", "secondary")]));
        assert_eq!(config.api_key, "secondary");

        let mut config = JarvisConfig::default();
        config.apply_env(env(&[("JARVIS_API_BASE", "http://localhost:9000")]));
        assert_eq!(config.api_base, "http://localhost:9000");
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"persona":"FRIDAY","simulation":{"anomaly":{"tick_ms":100}}}"#,
        )
        .unwrap();

        let config = JarvisConfig::load_from(&path).unwrap();
        assert_eq!(config.persona, Persona::Friday);
        assert_eq!(config.simulation.anomaly.tick_ms, 100);
        assert_eq!(config.simulation.anomaly.dwell_min_ms, 45_000);
        assert_eq!(config.simulation.telemetry.interval_ms, 2000);
        assert_eq!(config.models.maps, "gemini-2.5-flash");
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = JarvisConfig {
            api_key: "k".to_string(),
            location: Some(GeoPoint::new(40.7, -74.0)),
            ..JarvisConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(JarvisConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JarvisConfig::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = JarvisConfig::default();
        config.simulation.anomaly.dwell_min_ms = 80_000;
        assert!(config.validate().is_err());

        let mut config = JarvisConfig::default();
        config.simulation.anomaly.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = JarvisConfig::default();
        config.simulation.telemetry.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = JarvisConfig::default();
        config.simulation.telemetry.cpu.lo = 200.0;
        assert!(config.validate().is_err());

        let mut config = JarvisConfig::default();
        config.simulation.anomaly.locations.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));

        let mut config = JarvisConfig::default();
        config.location = Some(GeoPoint::new(95.0, 0.0));
        assert!(config.validate().is_err());
    }
}
