//! Host-side ready watchdog
//!
//! After issuing `start`, the host waits a bounded time for the status. No
//! answer usually means the platform silently blocked the overlay.

use super::events::{Status, StatusEvent};
use log::warn;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostNotice {
    Ready,
    Failed(String),
    /// Nothing arrived in time; the overlay was probably not shown
    NoResponse,
}

impl HostNotice {
    /// Text for the host's toast or dialog
    pub fn message(&self) -> String {
        match self {
            HostNotice::Ready => "Overlay ready".to_string(),
            HostNotice::Failed(msg) => format!("Overlay failed: {}", msg),
            HostNotice::NoResponse => {
                "Overlay not detected. Check overlay and notification permissions.".to_string()
            }
        }
    }
}

pub async fn wait_for_status(rx: oneshot::Receiver<StatusEvent>, timeout: Duration) -> HostNotice {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(StatusEvent {
            status: Status::Ready,
            ..
        })) => HostNotice::Ready,
        Ok(Ok(StatusEvent {
            status: Status::Failed,
            message,
            ..
        })) => HostNotice::Failed(message.unwrap_or_else(|| "unknown error".to_string())),
        Ok(Err(_)) => {
            warn!("Service dropped the status channel without reporting");
            HostNotice::NoResponse
        }
        Err(_) => {
            warn!("No status within {:?}", timeout);
            HostNotice::NoResponse
        }
    }
}
