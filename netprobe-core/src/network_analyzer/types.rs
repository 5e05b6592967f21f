//! Network Analyzer Types
//!
//! Probe results and measurement session state

use crate::error::NetProbeError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
//  PROBE RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// What a probe measured
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    Latency,
    DownloadThroughput,
    UploadThroughput,
}

impl ProbeKind {
    pub fn unit(&self) -> ProbeUnit {
        match self {
            ProbeKind::Latency => ProbeUnit::Ms,
            ProbeKind::DownloadThroughput | ProbeKind::UploadThroughput => ProbeUnit::Mbps,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeKind::Latency => "Latency",
            ProbeKind::DownloadThroughput => "Download",
            ProbeKind::UploadThroughput => "Upload",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeUnit {
    Ms,
    Mbps,
}

impl fmt::Display for ProbeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeUnit::Ms => write!(f, "ms"),
            ProbeUnit::Mbps => write!(f, "Mbps"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    Ok,
    Failed,
}

/// Outcome of a single probe. Immutable once produced.
///
/// Failure is an explicit variant rather than a negative value, so a failed
/// probe can never be mistaken for a measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    kind: ProbeKind,
    outcome: ProbeOutcome,
    measured_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ProbeOutcome {
    Ok { value: f64 },
    Failed { reason: Option<String> },
}

impl ProbeResult {
    /// Successful latency result in whole milliseconds
    pub fn latency_ms(ms: u64) -> Self {
        Self::new(ProbeKind::Latency, ProbeOutcome::Ok { value: ms as f64 })
    }

    /// Successful throughput result, rounded to two decimals.
    ///
    /// Non-finite or negative rates cannot come from a valid transfer and are
    /// recorded as failures.
    pub fn throughput_mbps(kind: ProbeKind, mbps: f64) -> Self {
        debug_assert!(kind.unit() == ProbeUnit::Mbps);
        if !mbps.is_finite() || mbps < 0.0 {
            let e = NetProbeError::ProbeDataAnomaly(format!("invalid rate {}", mbps));
            return Self::from_error(kind, &e);
        }
        Self::new(
            kind,
            ProbeOutcome::Ok {
                value: round_two_decimals(mbps),
            },
        )
    }

    pub fn failed(kind: ProbeKind, reason: impl Into<String>) -> Self {
        Self::new(
            kind,
            ProbeOutcome::Failed {
                reason: Some(reason.into()),
            },
        )
    }

    /// Failed result whose reason is the error's display text
    pub fn from_error(kind: ProbeKind, error: &NetProbeError) -> Self {
        Self::failed(kind, error.to_string())
    }

    fn new(kind: ProbeKind, outcome: ProbeOutcome) -> Self {
        Self {
            kind,
            outcome,
            measured_at: chrono::Utc::now(),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn unit(&self) -> ProbeUnit {
        self.kind.unit()
    }

    pub fn status(&self) -> ProbeStatus {
        match self.outcome {
            ProbeOutcome::Ok { .. } => ProbeStatus::Ok,
            ProbeOutcome::Failed { .. } => ProbeStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status() == ProbeStatus::Ok
    }

    /// Measured value, `None` when the probe failed
    pub fn value(&self) -> Option<f64> {
        match self.outcome {
            ProbeOutcome::Ok { value } => Some(value),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    /// Value with the `-1` failure sentinel, for hosts that expect a plain number
    pub fn value_or_sentinel(&self) -> f64 {
        self.value().unwrap_or(-1.0)
    }

    /// Best-effort diagnostic for failed probes
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Failed { reason } => reason.as_deref(),
            ProbeOutcome::Ok { .. } => None,
        }
    }

    pub fn measured_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.measured_at
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) if self.unit() == ProbeUnit::Ms => {
                write!(f, "{}: {} {}", self.kind.label(), v as u64, self.unit())
            }
            Some(v) => write!(f, "{}: {:.2} {}", self.kind.label(), v, self.unit()),
            None => write!(f, "{}: failed", self.kind.label()),
        }
    }
}

pub fn round_two_decimals(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Average bitrate in Mbps, or `None` when the sample cannot produce a rate
pub fn compute_mbps(bytes: u64, elapsed_secs: f64) -> Option<f64> {
    if bytes == 0 || !(elapsed_secs > 0.0) {
        return None;
    }
    Some(round_two_decimals(bytes as f64 * 8.0 / 1_000_000.0 / elapsed_secs))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  SESSION TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of one user-triggered session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current phase of a measurement session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    RunningLatency,
    RunningDownload,
    RunningUpload,
    Complete,
}

impl SessionState {
    /// State while `kind` is in flight
    pub fn running(kind: ProbeKind) -> Self {
        match kind {
            ProbeKind::Latency => SessionState::RunningLatency,
            ProbeKind::DownloadThroughput => SessionState::RunningDownload,
            ProbeKind::UploadThroughput => SessionState::RunningUpload,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SessionState::RunningLatency
                | SessionState::RunningDownload
                | SessionState::RunningUpload
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Ready",
            SessionState::RunningLatency => "Testing Latency",
            SessionState::RunningDownload => "Testing Download",
            SessionState::RunningUpload => "Testing Upload",
            SessionState::Complete => "Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_result() {
        let r = ProbeResult::latency_ms(42);
        assert_eq!(r.kind(), ProbeKind::Latency);
        assert_eq!(r.unit(), ProbeUnit::Ms);
        assert_eq!(r.status(), ProbeStatus::Ok);
        assert_eq!(r.value(), Some(42.0));
        assert_eq!(r.to_string(), "Latency: 42 ms");
    }

    #[test]
    fn test_failed_result_has_no_value() {
        let r = ProbeResult::failed(ProbeKind::Latency, "connect timeout");
        assert_eq!(r.status(), ProbeStatus::Failed);
        assert_eq!(r.value(), None);
        assert_eq!(r.value_or_sentinel(), -1.0);
        assert_eq!(r.failure_reason(), Some("connect timeout"));
        assert_eq!(r.to_string(), "Latency: failed");
    }

    #[test]
    fn test_failure_reason_carries_error_category() {
        let e = NetProbeError::ProbeTransport("timed out".to_string());
        let r = ProbeResult::from_error(ProbeKind::Latency, &e);
        assert_eq!(r.failure_reason(), Some("Probe transport failure: timed out"));

        let r = ProbeResult::throughput_mbps(ProbeKind::DownloadThroughput, f64::NAN);
        assert_eq!(r.status(), ProbeStatus::Failed);
        assert!(r.failure_reason().unwrap().starts_with("Probe data anomaly:"));
    }

    #[test]
    fn test_throughput_rounds_two_decimals() {
        let r = ProbeResult::throughput_mbps(ProbeKind::DownloadThroughput, 12.34567);
        assert_eq!(r.value(), Some(12.35));
        assert_eq!(r.unit(), ProbeUnit::Mbps);
        assert_eq!(r.to_string(), "Download: 12.35 Mbps");
    }

    #[test]
    fn test_throughput_rejects_non_finite() {
        let r = ProbeResult::throughput_mbps(ProbeKind::UploadThroughput, f64::INFINITY);
        assert_eq!(r.status(), ProbeStatus::Failed);
        let r = ProbeResult::throughput_mbps(ProbeKind::UploadThroughput, f64::NAN);
        assert_eq!(r.status(), ProbeStatus::Failed);
        let r = ProbeResult::throughput_mbps(ProbeKind::UploadThroughput, -3.0);
        assert_eq!(r.status(), ProbeStatus::Failed);
    }

    #[test]
    fn test_compute_mbps_reference_case() {
        // 3,750,000 bytes in 3 s = 10 Mbps
        assert_eq!(compute_mbps(3_750_000, 3.0), Some(10.0));
    }

    #[test]
    fn test_compute_mbps_zero_elapsed_or_bytes() {
        assert_eq!(compute_mbps(1_000, 0.0), None);
        assert_eq!(compute_mbps(1_000, -1.0), None);
        assert_eq!(compute_mbps(1_000, f64::NAN), None);
        assert_eq!(compute_mbps(0, 3.0), None);
    }

    #[test]
    fn test_session_state_running() {
        assert!(!SessionState::Idle.is_running());
        assert!(SessionState::RunningLatency.is_running());
        assert!(SessionState::RunningDownload.is_running());
        assert!(SessionState::RunningUpload.is_running());
        assert!(!SessionState::Complete.is_running());
    }

    #[test]
    fn test_probe_result_serializes_status() {
        let json = serde_json::to_string(&ProbeResult::latency_ms(7)).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""value":7.0"#));
    }
}
