//! Core config: personality matrix, alert throttle, protocols, effective settings.

use colored::*;

use crate::config::{JarvisConfig, Persona};
use crate::display::{bar, section};

pub const SECURITY_PROTOCOLS: [&str; 4] = [
    "HOUSE_PARTY_PROTOCOL",
    "CLEAN_SLATE_PROTOCOL",
    "BARF_AUGMENTED_REALITY",
    "ORBITAL_DROP_AUTHORIZATION",
];

pub const WARNING: &str = "WARNING: MODIFYING CORE SYSTEM PARAMETERS WITHOUT AUTHORIZED STARK_INDUSTRIES CLEARANCE MAY RESULT IN CATASTROPHIC SUIT FAILURE.";

/// Only the last four characters of the key are shown
pub fn mask_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "NOT CONFIGURED".to_string();
    }
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}

pub fn render(config: &JarvisConfig) -> String {
    let mut out = vec![section("CORE_SYSTEM_CONFIG")];

    out.push("  PERSONALITY_MATRIX".bright_black().to_string());
    let personas: Vec<String> = Persona::ALL
        .iter()
        .map(|p| {
            if *p == config.persona {
                format!("[{}]", p).black().on_cyan().bold().to_string()
            } else {
                format!(" {} ", p).cyan().dimmed().to_string()
            }
        })
        .collect();
    out.push(format!("  {}", personas.join("  ")));

    out.push("  SYSTEM_ALERT_THROTTLE".bright_black().to_string());
    out.push(format!(
        "  MINIMAL {} OVERLOAD  {}%",
        bar(config.alert_throttle as f64, 30, false),
        config.alert_throttle
    ));

    out.push("  SECURITY_PROTOCOLS".bright_black().to_string());
    for protocol in SECURITY_PROTOCOLS {
        out.push(format!("  {:<30} {}", protocol, "ARMED".cyan()));
    }
    out.push(String::new());

    out.push(section("EFFECTIVE CONFIGURATION"));
    out.push(format!("  API KEY       {}", mask_key(&config.api_key).cyan()));
    out.push(format!("  API BASE      {}", config.api_base.cyan()));
    out.push(format!("  CHAT MODEL    {}", config.models.chat.cyan()));
    out.push(format!("  SPEECH MODEL  {} ({})", config.models.speech.cyan(), config.models.voice));
    out.push(format!("  VISION MODEL  {}", config.models.vision.cyan()));
    out.push(format!("  MAPS MODEL    {}", config.models.maps.cyan()));
    out.push(format!(
        "  VOICE         {}",
        if config.voice_enabled { "ON".green() } else { "OFF".bright_black() }
    ));
    out.push(format!(
        "  CONFIG FILE   {}",
        JarvisConfig::config_path().display().to_string().bright_black()
    ));
    out.push(String::new());
    out.push(format!("  {}", WARNING.bright_black()));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(""), "NOT CONFIGURED");
        assert_eq!(mask_key("AIzaSyExample1234"), "****1234");
        assert_eq!(mask_key("ab"), "****ab");
    }

    #[test]
    fn test_render_never_leaks_key() {
        let config = JarvisConfig {
            api_key: "AIzaSySecretValue9876".to_string(),
            persona: Persona::Edith,
            ..JarvisConfig::default()
        };
        let text = render(&config);
        assert!(!text.contains("SecretValue"));
        assert!(text.contains("9876"));
        assert!(text.contains("EDITH"));
        assert!(text.contains("CLEAN_SLATE_PROTOCOL"));
        assert!(text.contains("gemini-2.5-flash-preview-tts"));
    }
}
