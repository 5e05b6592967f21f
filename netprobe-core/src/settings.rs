//! Settings persistence module
//!
//! Probe endpoints, timeouts and overlay tunables. Saved to and loaded from
//! `settings.json` in the platform config directory.

use crate::error::{NetProbeError, NetProbeResult};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";
const APP_NAME: &str = "NetProbe";

/// Time allowed for the latency probe when sizing the panel against a session
pub const LATENCY_HEADROOM_MS: u64 = 1_000;

/// Network endpoints used by the probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeTargets {
    /// Near-empty response endpoint used for latency (HEAD)
    pub latency_url: String,
    /// Bulk payload endpoint; `?bytes=N` is appended
    pub download_url: String,
    /// Payload size requested from the download endpoint
    pub download_bytes: u64,
    /// Endpoint that accepts a streamed POST body
    pub upload_url: String,
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            latency_url: "https://www.gstatic.com/generate_204".to_string(),
            download_url: "https://speed.cloudflare.com/__down".to_string(),
            download_bytes: 25_000_000,
            upload_url: "https://speed.cloudflare.com/__up".to_string(),
        }
    }
}

impl ProbeTargets {
    /// Download URL parameterized by byte count
    pub fn download_url_with_size(&self) -> String {
        let sep = if self.download_url.contains('?') { '&' } else { '?' };
        format!("{}{}bytes={}", self.download_url, sep, self.download_bytes)
    }
}

/// Timeouts and measurement window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeTimeouts {
    pub connect_ms: u64,
    /// Read and write timeout
    pub read_ms: u64,
    /// Throughput measurement window
    pub window_ms: u64,
    /// Upload chunk size in bytes
    pub chunk_bytes: usize,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            read_ms: 15_000,
            window_ms: 3_000,
            chunk_bytes: 16 * 1024,
        }
    }
}

impl ProbeTimeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Floating control and result panel tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// How long the panel stays visible after the latest tap
    pub panel_hide_ms: u64,
    /// Pointer displacement (either axis) that turns a press into a drag
    pub drag_threshold_px: f32,
    pub initial_x: f32,
    pub initial_y: f32,
    /// Vertical offset of the panel below the control
    pub panel_offset_y: f32,
    /// Also run the upload probe after download on tap
    pub chain_upload: bool,
    pub node_label: String,
    pub route_label: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            panel_hide_ms: 5_000,
            drag_threshold_px: 10.0,
            initial_x: 50.0,
            initial_y: 300.0,
            panel_offset_y: 70.0,
            chain_upload: false,
            node_label: "current".to_string(),
            route_label: "system proxy".to_string(),
        }
    }
}

impl OverlaySettings {
    pub fn panel_hide(&self) -> Duration {
        Duration::from_millis(self.panel_hide_ms)
    }
}

/// How missing permissions are handled at service start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionEnforcement {
    /// Abort startup as soon as a required permission is missing
    #[default]
    Strict,
    /// Log and carry on; the platform's own refusal ends the lifecycle
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub permission_enforcement: PermissionEnforcement,
    /// How long the host waits for a status report after `start`
    pub ready_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            permission_enforcement: PermissionEnforcement::Strict,
            ready_timeout_ms: 3_000,
        }
    }
}

impl ServiceSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// All NetProbe settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetProbeSettings {
    pub targets: ProbeTargets,
    pub timeouts: ProbeTimeouts,
    pub overlay: OverlaySettings,
    pub service: ServiceSettings,
}

impl NetProbeSettings {
    /// Shortest panel duration that lets every planned probe finish.
    ///
    /// The panel hides on schedule even mid-session, so it must outlast the
    /// throughput windows plus the latency probe.
    pub fn min_panel_hide_ms(&self) -> u64 {
        let windows = if self.overlay.chain_upload { 2 } else { 1 };
        self.timeouts
            .window_ms
            .saturating_mul(windows)
            .saturating_add(LATENCY_HEADROOM_MS)
    }

    /// Reject values that would make a probe or timer meaningless
    pub fn validate(&self) -> NetProbeResult<()> {
        let invalid = |msg: &str| Err(NetProbeError::InvalidConfig(msg.to_string()));

        if self.timeouts.window_ms == 0 {
            return invalid("measurement window must be greater than zero");
        }
        if self.timeouts.connect_ms == 0 || self.timeouts.read_ms == 0 {
            return invalid("timeouts must be greater than zero");
        }
        if self.timeouts.chunk_bytes == 0 {
            return invalid("chunk size must be greater than zero");
        }
        if self.overlay.panel_hide_ms == 0 {
            return invalid("panel hide duration must be greater than zero");
        }
        if !(self.overlay.drag_threshold_px >= 0.0) {
            return invalid("drag threshold must be a non-negative number");
        }
        let needed = self.min_panel_hide_ms();
        if self.overlay.panel_hide_ms < needed {
            return Err(NetProbeError::InvalidConfig(format!(
                "panel hide duration {}ms is shorter than a full session ({}ms)",
                self.overlay.panel_hide_ms, needed
            )));
        }
        for (name, url) in [
            ("latency", &self.targets.latency_url),
            ("download", &self.targets.download_url),
            ("upload", &self.targets.upload_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(NetProbeError::InvalidConfig(format!(
                    "{} endpoint is not a valid URL: {}",
                    name, url
                )));
            }
        }
        Ok(())
    }
}

/// Get the settings directory path
fn get_settings_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

/// Get the full path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    get_settings_dir().map(|p| p.join(SETTINGS_FILE))
}

/// Load settings from the default location, falling back to defaults
pub fn load_settings() -> NetProbeSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => {
            debug!("Could not determine settings path, using defaults");
            NetProbeSettings::default()
        }
    }
}

/// Load settings from `path`; a missing or unreadable file yields defaults
pub fn load_settings_from(path: &Path) -> NetProbeSettings {
    if !path.exists() {
        debug!("Settings file does not exist, using defaults");
        return NetProbeSettings::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file: {}", e);
                NetProbeSettings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file: {}", e);
            NetProbeSettings::default()
        }
    }
}

/// Save settings to the default location
pub fn save_settings(settings: &NetProbeSettings) -> NetProbeResult<()> {
    let path = settings_path().ok_or_else(|| {
        NetProbeError::InvalidConfig("Could not determine settings directory".to_string())
    })?;
    save_settings_to(settings, &path)
}

pub fn save_settings_to(settings: &NetProbeSettings, path: &Path) -> NetProbeResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    info!("Saved settings to {:?}", path);
    Ok(())
}
