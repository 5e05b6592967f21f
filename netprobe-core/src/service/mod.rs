//! Service Module
//!
//! Permission-gated lifecycle around the overlay, and the one-shot status
//! channel back to the host UI.

pub mod controller;
pub mod events;
pub mod platform;
pub mod watchdog;

pub use controller::{ServiceController, ServiceMode, ServicePhase, ServiceState};
pub use events::{Status, StatusEvent, StatusReporter};
pub use platform::{Platform, StubPlatform, SurfaceKind};
pub use watchdog::{wait_for_status, HostNotice};
