//! Status events sent to the host UI
//!
//! Exactly one [`StatusEvent`] is delivered per start attempt. The reporter
//! is consumed by sending, so a second report cannot be expressed.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ready,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: Status,
    pub message: Option<String>,
    /// User-facing explanation for fatal failures, with settings guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl StatusEvent {
    pub fn ready() -> Self {
        Self {
            status: Status::Ready,
            message: None,
            hint: None,
        }
    }

    pub fn ready_with(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ready()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: Some(message.into()),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == Status::Ready
    }
}

/// Sending half of the one-shot status channel
#[derive(Debug)]
pub struct StatusReporter {
    tx: oneshot::Sender<StatusEvent>,
}

impl StatusReporter {
    pub fn new() -> (Self, oneshot::Receiver<StatusEvent>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn report(self, event: StatusEvent) {
        match event.status {
            Status::Ready => info!("Status: ready"),
            Status::Failed => warn!(
                "Status: failed ({})",
                event.message.as_deref().unwrap_or("no detail")
            ),
        }
        if self.tx.send(event).is_err() {
            debug!("Host stopped listening for status");
        }
    }
}
