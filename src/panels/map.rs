//! Geolocation: grounded perimeter scans around a fixed position.

use colored::*;
use tracing::warn;

use crate::config::GeoPoint;
use crate::display::section;
use crate::gateway::{AiGateway, NearbyReport};

pub const DEFAULT_QUERY: &str = "Find strategic landmarks and resources nearby";
pub const IDLE_TEXT: &str = "Initiate perimeter scan for data...";

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Updated,
    /// No position known yet
    NoPosition,
    /// Gateway failed; the previous report is kept
    Failed,
}

#[derive(Debug, Clone)]
pub struct MapPanel {
    position: Option<GeoPoint>,
    query: String,
    report: NearbyReport,
}

impl Default for MapPanel {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MapPanel {
    pub fn new(position: Option<GeoPoint>) -> Self {
        Self {
            position,
            query: DEFAULT_QUERY.to_string(),
            report: NearbyReport::default(),
        }
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.position
    }

    pub fn set_position(&mut self, point: GeoPoint) {
        self.position = Some(point);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Blank queries keep the current one
    pub fn set_query(&mut self, query: &str) {
        if !query.trim().is_empty() {
            self.query = query.trim().to_string();
        }
    }

    pub fn report(&self) -> &NearbyReport {
        &self.report
    }

    pub fn can_scan(&self) -> bool {
        self.position.is_some()
    }

    pub async fn scan<G: AiGateway>(&mut self, gateway: &G) -> ScanOutcome {
        let Some(point) = self.position else {
            return ScanOutcome::NoPosition;
        };
        match gateway
            .search_nearby(point.latitude, point.longitude, &self.query)
            .await
        {
            Ok(report) => {
                self.report = report;
                ScanOutcome::Updated
            }
            Err(err) => {
                warn!(error = %err, "perimeter scan failed");
                ScanOutcome::Failed
            }
        }
    }

    pub fn render(&self) -> String {
        let coord = |v: Option<f64>| v.map_or_else(|| "---".to_string(), |v| format!("{:.6}", v));
        let mut out = vec![section("GEOLOCATION")];
        out.push(format!(
            "  LAT: {}   LNG: {}   ALT: 12.4m",
            coord(self.position.map(|p| p.latitude)).cyan(),
            coord(self.position.map(|p| p.longitude)).cyan()
        ));
        out.push(format!("  QUERY: {}", self.query.bright_white()));
        if !self.can_scan() {
            out.push(format!(
                "  {}",
                "SCAN OFFLINE: NO POSITION  [/locate <lat> <lng>]".yellow()
            ));
        }
        out.push(String::new());
        out.push(section("PERIMETER REPORT"));
        let text = if self.report.text.is_empty() {
            IDLE_TEXT
        } else {
            self.report.text.as_str()
        };
        for line in text.lines() {
            out.push(format!("  {}", line.cyan()));
        }
        for source in &self.report.sources {
            let uri = source.uri.as_deref().unwrap_or("");
            out.push(format!(
                "  {} {}",
                format!(">> {}", source.display_title()).cyan().bold(),
                uri.bright_black()
            ));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult};
    use crate::gateway::{GroundingSource, HistoryTurn};
    use std::cell::Cell;

    struct Satellite {
        fail: Cell<bool>,
    }

    impl AiGateway for Satellite {
        async fn generate_chat_reply(&self, _: &str, _: &[HistoryTurn]) -> GatewayResult<String> {
            unreachable!()
        }

        async fn synthesize_speech(&self, _: &str) -> GatewayResult<()> {
            unreachable!()
        }

        async fn analyze_image(&self, _: &[u8], _: &str, _: &str) -> GatewayResult<String> {
            unreachable!()
        }

        async fn search_nearby(&self, lat: f64, lng: f64, query: &str) -> GatewayResult<NearbyReport> {
            if self.fail.get() {
                return Err(GatewayError::Transport("uplink lost".to_string()));
            }
            Ok(NearbyReport {
                text: format!("{} @ {:.1},{:.1}", query, lat, lng),
                sources: vec![GroundingSource {
                    index: 0,
                    uri: Some("https://maps.example/0".to_string()),
                    title: None,
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_scan_needs_position() {
        let gateway = Satellite { fail: Cell::new(false) };
        let mut panel = MapPanel::default();
        assert_eq!(panel.scan(&gateway).await, ScanOutcome::NoPosition);
        assert!(panel.render().contains("---"));
        assert!(panel.render().contains(IDLE_TEXT));
    }

    #[tokio::test]
    async fn test_scan_and_failure_keeps_previous() {
        let gateway = Satellite { fail: Cell::new(false) };
        let mut panel = MapPanel::new(Some(GeoPoint::new(40.7128, -74.006)));
        assert_eq!(panel.scan(&gateway).await, ScanOutcome::Updated);
        assert_eq!(panel.report().text, format!("{} @ 40.7,-74.0", DEFAULT_QUERY));

        let rendered = panel.render();
        assert!(rendered.contains(">> LOCATION_REF_0"));
        assert!(rendered.contains("40.712800"));

        gateway.fail.set(true);
        panel.set_query("fuel depots");
        assert_eq!(panel.scan(&gateway).await, ScanOutcome::Failed);
        assert_eq!(panel.report().text, format!("{} @ 40.7,-74.0", DEFAULT_QUERY));
        assert_eq!(panel.query(), "fuel depots");
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let mut panel = MapPanel::default();
        panel.set_query("  ");
        assert_eq!(panel.query(), DEFAULT_QUERY);
    }
}
