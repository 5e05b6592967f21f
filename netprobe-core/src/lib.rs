//! NetProbe Core Library
//!
//! On-demand network diagnostics behind a floating overlay control:
//! latency and throughput probes, the overlay gesture/panel state machine,
//! and the permission-gated service lifecycle that hosts it.

pub mod clock;
pub mod error;
pub mod error_messages;
pub mod network_analyzer;
pub mod overlay;
pub mod service;
pub mod settings;

// Re-export commonly used items
pub use error::{NetProbeError, NetProbeResult};
pub use error_messages::{permission_hint, user_friendly_error};
pub use network_analyzer::{MeasurementSession, ProbeKind, ProbeResult, ProbeRunner, ProbeStatus};
pub use service::{ServiceController, ServiceMode, StatusEvent};
pub use settings::{load_settings, save_settings, NetProbeSettings};
