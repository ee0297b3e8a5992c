//! ═══════════════════════════════════════════════════════════════════════════════
//! GATEWAY — Generative AI Backend
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Panels talk to the backend through `AiGateway` only. `GeminiClient` is the
//! production implementation; tests plug in scripted gateways.
//! ═══════════════════════════════════════════════════════════════════════════════

pub mod audio;
pub mod gemini;

use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

pub use audio::{decode_pcm16, AudioSink, NullSink, WavSink, TTS_SAMPLE_RATE};
pub use gemini::GeminiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior chat turn sent as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A place the maps tool grounded its answer on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Position among the grounding chunks of the response
    pub index: usize,
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl GroundingSource {
    /// Title, or `LOCATION_REF_<index>` when the upstream gave none
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("LOCATION_REF_{}", self.index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyReport {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[allow(async_fn_in_trait)]
pub trait AiGateway {
    /// Reply to `prompt` given the most recent turns
    async fn generate_chat_reply(&self, prompt: &str, history: &[HistoryTurn])
        -> GatewayResult<String>;

    /// Speak `text`. Succeeds silently when the upstream returns no audio.
    async fn synthesize_speech(&self, text: &str) -> GatewayResult<()>;

    async fn analyze_image(&self, image: &[u8], mime_type: &str, prompt: &str)
        -> GatewayResult<String>;

    async fn search_nearby(&self, latitude: f64, longitude: f64, query: &str)
        -> GatewayResult<NearbyReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_fallback() {
        let named = GroundingSource {
            index: 0,
            uri: None,
            title: Some("Stark Tower".to_string()),
        };
        assert_eq!(named.display_title(), "Stark Tower");

        let blank = GroundingSource {
            index: 3,
            uri: Some("https://maps.example/3".to_string()),
            title: Some(String::new()),
        };
        assert_eq!(blank.display_title(), "LOCATION_REF_3");
    }
}
