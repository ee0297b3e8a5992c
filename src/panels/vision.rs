//! Optics: analyze captured frames. Frames are image files; capturing them
//! from a camera happens outside the HUD.

use std::path::{Path, PathBuf};

use colored::*;
use tracing::warn;

use crate::display::section;
use crate::error::JarvisResult;
use crate::gateway::AiGateway;

pub const VISION_PROMPT: &str =
    "Analyze this tactical feed. Identify any objects, persons, or threats.";
pub const NO_INTEL: &str = "No intelligence gathered.";
pub const SENSOR_ERROR: &str = "Error communicating with orbital sensor array.";
pub const AWAITING: &str = "Awaiting sensor data...";

/// MIME type from the file extension, JPEG when unknown
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

#[derive(Debug, Clone)]
pub struct VisionPanel {
    prompt: String,
    analysis: Option<String>,
    last_frame: Option<PathBuf>,
}

impl Default for VisionPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionPanel {
    pub fn new() -> Self {
        Self {
            prompt: VISION_PROMPT.to_string(),
            analysis: None,
            last_frame: None,
        }
    }

    /// Replace the analysis prompt. Blank keeps the current one.
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        if !prompt.trim().is_empty() {
            self.prompt = prompt.trim().to_string();
        }
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    /// Read a frame from disk and analyze it. Only a read failure is an error.
    pub async fn capture<G: AiGateway>(&mut self, gateway: &G, path: &Path) -> JarvisResult<&str> {
        let frame = tokio::fs::read(path).await?;
        self.last_frame = Some(path.to_path_buf());
        Ok(self.analyze(gateway, &frame, mime_for(path)).await)
    }

    pub async fn analyze<G: AiGateway>(&mut self, gateway: &G, frame: &[u8], mime_type: &str) -> &str {
        let text = match gateway.analyze_image(frame, mime_type, &self.prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => NO_INTEL.to_string(),
            Err(err) => {
                warn!(error = %err, "image analysis failed");
                SENSOR_ERROR.to_string()
            }
        };
        self.analysis.insert(text).as_str()
    }

    pub fn render(&self) -> String {
        let mut out = vec![section("OPTICS // TACTICAL FEED")];
        match &self.last_frame {
            Some(path) => out.push(format!("  FRAME: {}", path.display().to_string().cyan())),
            None => out.push(format!("  {}", "NO FRAME CAPTURED  [/capture <image>]".bright_black())),
        }
        out.push(String::new());
        out.push(section("ANALYSIS"));
        let body = self.analysis.as_deref().unwrap_or(AWAITING);
        for line in body.lines() {
            out.push(format!("  {}", line.cyan()));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult};
    use crate::gateway::{HistoryTurn, NearbyReport};
    use std::cell::RefCell;

    struct Optics {
        result: GatewayResult<String>,
        seen: RefCell<Vec<(usize, String, String)>>,
    }

    impl Optics {
        fn new(result: GatewayResult<String>) -> Self {
            Self {
                result,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl AiGateway for Optics {
        async fn generate_chat_reply(&self, _: &str, _: &[HistoryTurn]) -> GatewayResult<String> {
            unreachable!()
        }

        async fn synthesize_speech(&self, _: &str) -> GatewayResult<()> {
            unreachable!()
        }

        async fn analyze_image(&self, image: &[u8], mime: &str, prompt: &str) -> GatewayResult<String> {
            self.seen
                .borrow_mut()
                .push((image.len(), mime.to_string(), prompt.to_string()));
            self.result.clone()
        }

        async fn search_nearby(&self, _: f64, _: f64, _: &str) -> GatewayResult<NearbyReport> {
            unreachable!()
        }
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("frame.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("frame.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("frame")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_capture_sends_frame_with_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.png");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let gateway = Optics::new(Ok("One hostile drone.".to_string()));
        let mut panel = VisionPanel::new();
        let text = panel.capture(&gateway, &path).await.unwrap();
        assert_eq!(text, "One hostile drone.");

        let seen = gateway.seen.borrow();
        assert_eq!(seen[0], (4, "image/png".to_string(), VISION_PROMPT.to_string()));
    }

    #[tokio::test]
    async fn test_fallbacks() {
        let mut panel = VisionPanel::new();
        assert!(panel.render().contains(AWAITING));

        let empty = Optics::new(Ok(String::new()));
        assert_eq!(panel.analyze(&empty, &[0], "image/jpeg").await, NO_INTEL);

        let failing = Optics::new(Err(GatewayError::ApiKeyMissing));
        assert_eq!(panel.analyze(&failing, &[0], "image/jpeg").await, SENSOR_ERROR);
        assert_eq!(panel.analysis(), Some(SENSOR_ERROR));
    }

    #[tokio::test]
    async fn test_custom_prompt() {
        let gateway = Optics::new(Ok("Clear skies.".to_string()));
        let mut panel = VisionPanel::new().with_prompt("  Count the drones.  ");
        panel.analyze(&gateway, &[0, 1], "image/webp").await;
        assert_eq!(gateway.seen.borrow()[0].2, "Count the drones.");

        assert_eq!(VisionPanel::new().with_prompt(" ").prompt(), VISION_PROMPT);
    }

    #[tokio::test]
    async fn test_missing_frame_is_an_error() {
        let gateway = Optics::new(Ok("unused".to_string()));
        let mut panel = VisionPanel::new();
        assert!(panel
            .capture(&gateway, Path::new("/nonexistent/frame.jpg"))
            .await
            .is_err());
        assert!(panel.analysis().is_none());
    }
}
