//! Shared HTTP client for all probes
//!
//! One `reqwest::Client` (and its connection pool) is built per runner and
//! cloned into every probe. Each probe owns its own request lifecycle, so no
//! extra locking is needed.

use crate::error::{NetProbeError, NetProbeResult};
use crate::settings::ProbeTimeouts;
use reqwest::Client;

const USER_AGENT: &str = concat!("NetProbe/", env!("CARGO_PKG_VERSION"));

/// Build the probe client.
///
/// Only the connect timeout is set here; read/write timeouts are enforced per
/// operation so a long throughput stream is not cut off by a whole-request
/// deadline.
pub fn build_client(timeouts: &ProbeTimeouts) -> NetProbeResult<Client> {
    Client::builder()
        .connect_timeout(timeouts.connect())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NetProbeError::HttpClient(e.to_string()))
}

/// Short description of a reqwest error for logs and failure reasons
pub(crate) fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if let Some(status) = e.status() {
        format!("HTTP {}", status)
    } else {
        e.to_string()
    }
}
