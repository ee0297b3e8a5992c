//! ═══════════════════════════════════════════════════════════════════════════════
//! GEMINI CLIENT — Generative Language REST Integration
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Every operation is one `generateContent` call:
//!
//!   POST {api_base}/v1beta/models/{model}:generateContent
//!   x-goog-api-key: {api_key}
//!
//! Request bodies are built and responses picked apart by plain functions so
//! the wire format can be checked without a network.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::audio::{decode_pcm16, AudioSink, WavSink, TTS_SAMPLE_RATE};
use super::{AiGateway, GroundingSource, HistoryTurn, NearbyReport, Role};
use crate::config::{JarvisConfig, ModelConfig};
use crate::error::{GatewayError, GatewayResult};

/// Prompt used when image analysis is asked for without one
pub const DEFAULT_VISION_PROMPT: &str = "Analyze this image and provide tactical intelligence.";

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct GoogleMaps {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_maps: GoogleMaps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: LatLng,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

/// Body of a `generateContent` call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

impl GenerateContentRequest {
    fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            generation_config: None,
            tools: None,
            tool_config: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    pub maps: Option<MapsChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

pub fn chat_request(system: &str, history: &[HistoryTurn], prompt: &str) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content {
            role: Some(wire_role(turn.role).to_string()),
            parts: vec![Part::text(turn.content.clone())],
        })
        .collect();
    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part::text(prompt)],
    });

    let mut request = GenerateContentRequest::new(contents);
    if !system.is_empty() {
        request.system_instruction = Some(Content {
            role: None,
            parts: vec![Part::text(system)],
        });
    }
    request
}

pub fn speech_request(text: &str, voice: &str) -> GenerateContentRequest {
    let mut request = GenerateContentRequest::new(vec![Content {
        role: None,
        parts: vec![Part::text(text)],
    }]);
    request.generation_config = Some(GenerationConfig {
        response_modalities: vec!["AUDIO".to_string()],
        speech_config: SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice.to_string(),
                },
            },
        },
    });
    request
}

pub fn vision_request(image: &[u8], mime_type: &str, prompt: &str) -> GenerateContentRequest {
    use base64::Engine;

    let prompt = if prompt.trim().is_empty() {
        DEFAULT_VISION_PROMPT
    } else {
        prompt
    };
    GenerateContentRequest::new(vec![Content {
        role: None,
        parts: vec![
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(image),
                }),
            },
            Part::text(prompt),
        ],
    }])
}

pub fn maps_request(latitude: f64, longitude: f64, query: &str) -> GenerateContentRequest {
    let mut request = GenerateContentRequest::new(vec![Content {
        role: Some("user".to_string()),
        parts: vec![Part::text(query)],
    }]);
    request.tools = Some(vec![Tool {
        google_maps: GoogleMaps {},
    }]);
    request.tool_config = Some(ToolConfig {
        retrieval_config: RetrievalConfig {
            lat_lng: LatLng {
                latitude,
                longitude,
            },
        },
    });
    request
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE EXTRACTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Concatenated text parts of the first candidate
pub fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Base64 audio of the first inline part of the first candidate
pub fn inline_audio(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|p| p.inline_data.as_ref())
        .map(|d| d.data.as_str())
}

/// Maps chunks of the first candidate's grounding metadata
pub fn grounding_sources(response: &GenerateContentResponse) -> Vec<GroundingSource> {
    let Some(metadata) = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
    else {
        return Vec::new();
    };
    metadata
        .grounding_chunks
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            chunk.maps.as_ref().map(|maps| GroundingSource {
                index,
                uri: maps.uri.clone(),
                title: maps.title.clone(),
            })
        })
        .collect()
}

/// Turn a non-success body into an upstream error
fn upstream_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    GatewayError::Upstream { status, message }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

type RejectionHook = Box<dyn Fn() + Send + Sync>;

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    models: ModelConfig,
    system_instruction: String,
    sink: Box<dyn AudioSink + Send + Sync>,
    on_credential_rejected: Option<RejectionHook>,
}

impl GeminiClient {
    /// Create new client
    ///
    /// An empty key is accepted here; every call then fails with `ApiKeyMissing`.
    /// Speech is written as WAV files under the configured audio directory.
    pub fn new(config: &JarvisConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.trim().to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            models: config.models.clone(),
            system_instruction: config.system_instruction.clone(),
            sink: Box::new(WavSink::new(config.audio_dir_or_default())),
            on_credential_rejected: None,
        })
    }

    /// Send synthesized speech somewhere other than the WAV directory
    pub fn with_sink(mut self, sink: impl AudioSink + Send + Sync + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Called whenever the upstream says the key is unknown
    pub fn with_rejection_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_credential_rejected = Some(Box::new(hook));
        self
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, model)
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        let result = self.send(model, request).await;
        if let Err(err) = &result {
            if err.is_credential_rejected() {
                error!("API key rejected by upstream, prompting for re-selection");
                if let Some(hook) = &self.on_credential_rejected {
                    hook();
                }
            }
        }
        result
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        if self.api_key.is_empty() {
            return Err(GatewayError::ApiKeyMissing);
        }

        debug!(model, "generateContent");
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Decode(format!("failed to parse response: {}", e)))
    }
}

impl AiGateway for GeminiClient {
    async fn generate_chat_reply(
        &self,
        prompt: &str,
        history: &[HistoryTurn],
    ) -> GatewayResult<String> {
        let request = chat_request(&self.system_instruction, history, prompt);
        let response = self.generate(&self.models.chat, &request).await?;
        Ok(response_text(&response))
    }

    async fn synthesize_speech(&self, text: &str) -> GatewayResult<()> {
        let request = speech_request(text, &self.models.voice);
        let response = self.generate(&self.models.speech, &request).await?;
        match inline_audio(&response) {
            Some(payload) => {
                let samples = decode_pcm16(payload)?;
                self.sink.play(&samples, TTS_SAMPLE_RATE)
            }
            None => Ok(()),
        }
    }

    async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> GatewayResult<String> {
        let request = vision_request(image, mime_type, prompt);
        let response = self.generate(&self.models.vision, &request).await?;
        Ok(response_text(&response))
    }

    async fn search_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        query: &str,
    ) -> GatewayResult<NearbyReport> {
        let request = maps_request(latitude, longitude, query);
        let response = self.generate(&self.models.maps, &request).await?;
        Ok(NearbyReport {
            text: response_text(&response),
            sources: grounding_sources(&response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn to_json(request: &GenerateContentRequest) -> Value {
        serde_json::to_value(request).unwrap()
    }

    #[test]
    fn test_chat_request_maps_assistant_to_model() {
        let history = [
            HistoryTurn::new(Role::Assistant, "Welcome back, Sir."),
            HistoryTurn::new(Role::User, "Status?"),
        ];
        let body = to_json(&chat_request("Be JARVIS.", &history, "Run diagnostics"));

        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Run diagnostics");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be JARVIS.");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_speech_request_asks_for_audio() {
        let body = to_json(&speech_request("Hello", "Puck"));
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
    }

    #[test]
    fn test_vision_request_inlines_image() {
        let body = to_json(&vision_request(&[0xFF, 0xD8], "image/jpeg", ""));
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "/9g=");
        assert_eq!(parts[1]["text"], DEFAULT_VISION_PROMPT);
    }

    #[test]
    fn test_maps_request_carries_position() {
        let body = to_json(&maps_request(40.7, -74.0, "coffee"));
        assert_eq!(body["tools"], json!([{ "googleMaps": {} }]));
        assert_eq!(
            body["toolConfig"]["retrievalConfig"]["latLng"],
            json!({ "latitude": 40.7, "longitude": -74.0 })
        );
    }

    #[test]
    fn test_extractors() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "Two " },
                    { "text": "sites found." },
                    { "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AQA=" } }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://example.com" } },
                    { "maps": { "uri": "https://maps.example/a", "title": "Avengers Tower" } },
                    { "maps": { "uri": "https://maps.example/b" } }
                ]}
            }]
        }))
        .unwrap();

        assert_eq!(response_text(&response), "Two sites found.");
        assert_eq!(inline_audio(&response), Some("AQA="));

        let sources = grounding_sources(&response);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].display_title(), "Avengers Tower");
        assert_eq!(sources[1].display_title(), "LOCATION_REF_2");
    }

    #[test]
    fn test_empty_response() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response_text(&response), "");
        assert!(inline_audio(&response).is_none());
        assert!(grounding_sources(&response).is_empty());
    }

    #[test]
    fn test_upstream_error_prefers_api_message() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let err = upstream_error(404, body);
        assert!(err.is_credential_rejected());

        let err = upstream_error(502, "bad gateway");
        assert!(matches!(err, GatewayError::Upstream { status: 502, ref message } if message == "bad gateway"));
    }

    #[test]
    fn test_endpoint() {
        let config = JarvisConfig {
            api_base: "http://localhost:8080/".to_string(),
            ..JarvisConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let client = GeminiClient::new(&JarvisConfig::default())
            .unwrap()
            .with_rejection_hook(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let err = client.generate_chat_reply("hello", &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::ApiKeyMissing));
        assert_eq!(err.to_string(), "API_KEY_MISSING");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_sink_writes_wav_into_audio_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = JarvisConfig {
            audio_dir: Some(dir.path().join("voice")),
            ..JarvisConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        client.sink.play(&[0, 120, -120], TTS_SAMPLE_RATE).unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("voice"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].extension().unwrap(), "wav");
        let reader = hound::WavReader::open(&written[0]).unwrap();
        assert_eq!(reader.spec().sample_rate, TTS_SAMPLE_RATE);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn test_null_sink_discards() {
        let dir = tempfile::tempdir().unwrap();
        let config = JarvisConfig {
            audio_dir: Some(dir.path().join("voice")),
            ..JarvisConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap().with_sink(crate::gateway::NullSink);
        client.sink.play(&[1, 2, 3], TTS_SAMPLE_RATE).unwrap();
        assert!(!dir.path().join("voice").exists());
    }
}
