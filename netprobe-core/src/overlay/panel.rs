//! Result panel content
//!
//! While a session runs each probe line shows a "testing" placeholder; every
//! progress report fills in exactly the line for its probe kind.

use crate::network_analyzer::{format_speed, ProbeKind, ProbeResult};
use serde::Serialize;

/// State of a single probe line
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PanelField {
    /// Probe not part of the current session
    Blank,
    Testing,
    Value(String),
    Failed,
}

/// Everything the result panel displays
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelView {
    pub node: String,
    pub route: String,
    pub latency: PanelField,
    pub download: PanelField,
    pub upload: PanelField,
}

impl PanelView {
    pub fn new(node: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            route: route.into(),
            latency: PanelField::Blank,
            download: PanelField::Blank,
            upload: PanelField::Blank,
        }
    }

    /// Reset lines for a new session; `kinds` are the probes about to run
    pub fn begin_session(&mut self, kinds: &[ProbeKind]) {
        self.latency = PanelField::Blank;
        self.download = PanelField::Blank;
        self.upload = PanelField::Blank;
        for kind in kinds {
            *self.field_mut(*kind) = PanelField::Testing;
        }
    }

    /// Bind one probe result to its line
    pub fn apply(&mut self, result: &ProbeResult) {
        let field = match result.value() {
            Some(v) => PanelField::Value(format_value(result.kind(), v)),
            None => PanelField::Failed,
        };
        *self.field_mut(result.kind()) = field;
    }

    pub fn field(&self, kind: ProbeKind) -> &PanelField {
        match kind {
            ProbeKind::Latency => &self.latency,
            ProbeKind::DownloadThroughput => &self.download,
            ProbeKind::UploadThroughput => &self.upload,
        }
    }

    fn field_mut(&mut self, kind: ProbeKind) -> &mut PanelField {
        match kind {
            ProbeKind::Latency => &mut self.latency,
            ProbeKind::DownloadThroughput => &mut self.download,
            ProbeKind::UploadThroughput => &mut self.upload,
        }
    }

    /// Text lines in display order; blank probe lines are skipped
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Node: {}", self.node),
            format!("Route: {}", self.route),
        ];
        for kind in [
            ProbeKind::Latency,
            ProbeKind::DownloadThroughput,
            ProbeKind::UploadThroughput,
        ] {
            let text = match self.field(kind) {
                PanelField::Blank => continue,
                PanelField::Testing => "testing...".to_string(),
                PanelField::Value(v) => v.clone(),
                PanelField::Failed => "failed".to_string(),
            };
            lines.push(format!("{}: {}", kind.label(), text));
        }
        lines
    }
}

fn format_value(kind: ProbeKind, value: f64) -> String {
    match kind {
        ProbeKind::Latency => format!("{} ms", value as u64),
        ProbeKind::DownloadThroughput | ProbeKind::UploadThroughput => format_speed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_session_sets_placeholders() {
        let mut panel = PanelView::new("current", "system proxy");
        panel.begin_session(&[ProbeKind::Latency, ProbeKind::DownloadThroughput]);
        assert_eq!(panel.latency, PanelField::Testing);
        assert_eq!(panel.download, PanelField::Testing);
        assert_eq!(panel.upload, PanelField::Blank);
        assert_eq!(
            panel.lines(),
            vec![
                "Node: current",
                "Route: system proxy",
                "Latency: testing...",
                "Download: testing...",
            ]
        );
    }

    #[test]
    fn test_apply_updates_only_matching_field() {
        let mut panel = PanelView::new("n", "r");
        panel.begin_session(&[ProbeKind::Latency, ProbeKind::DownloadThroughput]);
        panel.apply(&ProbeResult::latency_ms(42));
        assert_eq!(panel.latency, PanelField::Value("42 ms".to_string()));
        assert_eq!(panel.download, PanelField::Testing);
    }

    #[test]
    fn test_failed_result_renders_label() {
        let mut panel = PanelView::new("n", "r");
        panel.begin_session(&[ProbeKind::Latency, ProbeKind::DownloadThroughput]);
        panel.apply(&ProbeResult::failed(ProbeKind::DownloadThroughput, "HTTP 500"));
        assert_eq!(panel.download, PanelField::Failed);
        assert!(panel.lines().contains(&"Download: failed".to_string()));
    }

    #[test]
    fn test_throughput_uses_speed_format() {
        let mut panel = PanelView::new("n", "r");
        panel.apply(&ProbeResult::throughput_mbps(ProbeKind::DownloadThroughput, 10.0));
        assert_eq!(panel.download, PanelField::Value("10.0 Mbps".to_string()));
    }

    #[test]
    fn test_new_session_clears_previous_values() {
        let mut panel = PanelView::new("n", "r");
        panel.apply(&ProbeResult::throughput_mbps(ProbeKind::UploadThroughput, 3.0));
        panel.begin_session(&[ProbeKind::Latency]);
        assert_eq!(panel.upload, PanelField::Blank);
        assert_eq!(panel.latency, PanelField::Testing);
    }
}
