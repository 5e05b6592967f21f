//! Error types for NetProbe

use crate::network_analyzer::client::describe_error;
use crate::service::platform::SurfaceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetProbeError {
    /// Overlay or foreground-execution permission missing or revoked
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The platform rejected attaching one of the overlay surfaces
    #[error("Failed to attach {surface} surface: {reason}")]
    SurfaceAttach { surface: SurfaceKind, reason: String },

    /// Connect/read/write timeout, connection error or non-success response
    #[error("Probe transport failure: {0}")]
    ProbeTransport(String),

    /// Zero-duration or zero-byte transfer that cannot yield a valid rate
    #[error("Probe data anomaly: {0}")]
    ProbeDataAnomaly(String),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("service stopped")]
    ServiceStopped,

    /// No tokio runtime to run the overlay loop on
    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("Settings serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetProbeError {
    /// Whether the error ends the current service lifecycle.
    ///
    /// Probe errors are contained at the probe boundary and only ever show up
    /// as a failed result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NetProbeError::PermissionDenied(_)
                | NetProbeError::SurfaceAttach { .. }
                | NetProbeError::ServiceStopped
                | NetProbeError::Runtime(_)
        )
    }
}

impl From<reqwest::Error> for NetProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            NetProbeError::HttpClient(e.to_string())
        } else {
            NetProbeError::ProbeTransport(describe_error(&e))
        }
    }
}

pub type NetProbeResult<T> = Result<T, NetProbeError>;
