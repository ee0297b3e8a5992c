//! ═══════════════════════════════════════════════════════════════════════════════
//! COMS LINK — Conversational Panel
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Each send carries the last `HISTORY_WINDOW` messages that were on screen
//! before it. Gateway failures never surface as errors here: the assistant
//! answers with the fallback line and the failure is logged.
//!
//! Speech is a separate step. `send` only queues the reply; the caller shows
//! it and then calls `speak_reply`, so a slow TTS call never holds up text.
//! ═══════════════════════════════════════════════════════════════════════════════

use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::display::section;
use crate::gateway::{AiGateway, HistoryTurn, Role};

pub const WELCOME: &str = "Welcome back, Sir. All systems are operating within normal parameters. How may I assist you today?";

pub const FALLBACK_REPLY: &str =
    "I apologize, Sir, I'm having trouble connecting to the neural link.";

/// Messages of context sent with each prompt
pub const HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    fn speaker(&self) -> &'static str {
        match self.role {
            Role::Assistant => "J.A.R.V.I.S.",
            Role::User => "USER_01",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatPanel {
    messages: Vec<ChatMessage>,
    voice_enabled: bool,
    unspoken: Option<String>,
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChatPanel {
    pub fn new(voice_enabled: bool) -> Self {
        Self {
            messages: vec![ChatMessage::new(Role::Assistant, WELCOME)],
            voice_enabled,
            unspoken: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn toggle_voice(&mut self) -> bool {
        self.voice_enabled = !self.voice_enabled;
        if !self.voice_enabled {
            self.unspoken = None;
        }
        self.voice_enabled
    }

    /// The context window for the next prompt
    pub fn recent_history(&self) -> Vec<HistoryTurn> {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[start..]
            .iter()
            .map(|m| HistoryTurn::new(m.role, m.content.clone()))
            .collect()
    }

    /// Send `input` and append both sides of the exchange.
    ///
    /// Blank input is ignored and returns `None`. `&mut self` keeps a second
    /// send from starting while one is in flight. The reply is never spoken
    /// here; a real reply with voice on is queued for `speak_reply`.
    pub async fn send<G: AiGateway>(&mut self, gateway: &G, input: &str) -> Option<&ChatMessage> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return None;
        }

        let history = self.recent_history();
        self.messages.push(ChatMessage::new(Role::User, prompt));
        self.unspoken = None;

        let reply = match gateway.generate_chat_reply(prompt, &history).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "chat reply failed");
                None
            }
        };

        if self.voice_enabled {
            self.unspoken = reply.clone();
        }
        let content = reply.unwrap_or_else(|| FALLBACK_REPLY.to_string());
        self.messages.push(ChatMessage::new(Role::Assistant, content));
        self.messages.last()
    }

    /// A reply waiting to be spoken, if any
    pub fn unspoken(&self) -> Option<&str> {
        self.unspoken.as_deref()
    }

    /// Speak the queued reply. Speech failures are logged, never surfaced.
    /// Returns whether anything was handed to the gateway.
    pub async fn speak_reply<G: AiGateway>(&mut self, gateway: &G) -> bool {
        let Some(text) = self.unspoken.take() else {
            return false;
        };
        if let Err(err) = gateway.synthesize_speech(&text).await {
            warn!(error = %err, "TTS error");
        }
        true
    }

    pub fn render(&self) -> String {
        let mut out = vec![format!(
            "{}  {}",
            section("COMS LINK"),
            if self.voice_enabled {
                "VOICE: ON".green()
            } else {
                "VOICE: OFF".bright_black()
            }
        )];
        for msg in &self.messages {
            let stamp = msg.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S");
            out.push(format!(
                "  {} {}",
                msg.speaker().bright_black(),
                format!("// {}", stamp).bright_black()
            ));
            let body = match msg.role {
                Role::Assistant => msg.content.cyan(),
                Role::User => msg.content.bright_white(),
            };
            out.push(format!("    {}", body));
        }
        out.push(String::new());
        out.push(format!("  {}", "TYPE COMMAND OR QUERY...".bright_black()));
        out.join("\n")
    }
}
