//! Overlay Module
//!
//! The persistent floating control and its timed result panel:
//! - Drag-vs-tap gesture recognition
//! - Panel content binding for probe results
//! - Lifecycle state machine and the event loop that drives it

pub mod controller;
pub mod driver;
pub mod gesture;
pub mod panel;

pub use controller::{OverlayCommand, OverlayController, OverlayPhase, OverlayState};
pub use driver::{OverlayDriver, OverlayHandle, OverlaySurface};
pub use gesture::{Gesture, GestureTracker, Point, PointerEvent};
pub use panel::{PanelField, PanelView};
