//! Platform Capabilities
//!
//! Everything the service needs from the host platform: permission checks,
//! foreground promotion and the two overlay surfaces. Desktop targets have no
//! permission model, so [`StubPlatform`] grants everything and just records
//! what was drawn.

use crate::overlay::{OverlaySurface, PanelView, Point};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The two independently attached overlay windows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// The draggable floating control
    Control,
    /// The result panel below it
    Panel,
}

impl SurfaceKind {
    /// Attach order; detach runs in reverse
    pub const ALL: [SurfaceKind; 2] = [SurfaceKind::Control, SurfaceKind::Panel];
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Control => write!(f, "control"),
            SurfaceKind::Panel => write!(f, "panel"),
        }
    }
}

/// Host platform collaborator.
///
/// Permission predicates are queried on every call; implementations must not
/// cache them, since the user can revoke a permission at any time.
pub trait Platform: OverlaySurface + Send + Sync + 'static {
    fn has_overlay_permission(&self) -> bool;

    fn has_foreground_execution_rights(&self) -> bool;

    /// Promote the process to a long-running foreground context
    fn enter_foreground(&self) -> Result<(), String>;

    fn exit_foreground(&self);

    fn attach_surface(&self, kind: SurfaceKind) -> Result<(), String>;

    fn detach_surface(&self, kind: SurfaceKind) -> Result<(), String>;

    /// Device manufacturer, used to pick permission guidance
    fn manufacturer(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
struct StubState {
    overlay_permission: bool,
    foreground_rights: bool,
    foreground_error: Option<String>,
    attach_errors: HashMap<SurfaceKind, String>,
    detach_errors: HashMap<SurfaceKind, String>,
    manufacturer: Option<String>,

    in_foreground: bool,
    attached: Vec<SurfaceKind>,
    attach_attempts: usize,
    control_position: Option<Point>,
    panel_position: Option<Point>,
    panel_visible: bool,
    panel_lines: Vec<String>,
}

/// Always-granted platform for targets without a permission model.
///
/// Each capability can be switched off, which makes it the test double for
/// the service lifecycle as well.
#[derive(Debug)]
pub struct StubPlatform {
    state: Mutex<StubState>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState {
                overlay_permission: true,
                foreground_rights: true,
                ..StubState::default()
            }),
        }
    }

    pub fn set_overlay_permission(&self, granted: bool) {
        self.state.lock().overlay_permission = granted;
    }

    pub fn set_foreground_rights(&self, granted: bool) {
        self.state.lock().foreground_rights = granted;
    }

    /// Make foreground promotion fail with `reason`
    pub fn fail_foreground(&self, reason: impl Into<String>) {
        self.state.lock().foreground_error = Some(reason.into());
    }

    pub fn fail_attach(&self, kind: SurfaceKind, reason: impl Into<String>) {
        self.state.lock().attach_errors.insert(kind, reason.into());
    }

    pub fn fail_detach(&self, kind: SurfaceKind, reason: impl Into<String>) {
        self.state.lock().detach_errors.insert(kind, reason.into());
    }

    pub fn set_manufacturer(&self, manufacturer: impl Into<String>) {
        self.state.lock().manufacturer = Some(manufacturer.into());
    }

    pub fn is_foreground(&self) -> bool {
        self.state.lock().in_foreground
    }

    pub fn attached(&self) -> Vec<SurfaceKind> {
        self.state.lock().attached.clone()
    }

    pub fn attach_attempts(&self) -> usize {
        self.state.lock().attach_attempts
    }

    pub fn control_position(&self) -> Option<Point> {
        self.state.lock().control_position
    }

    pub fn panel_position(&self) -> Option<Point> {
        self.state.lock().panel_position
    }

    pub fn is_panel_visible(&self) -> bool {
        self.state.lock().panel_visible
    }

    pub fn panel_lines(&self) -> Vec<String> {
        self.state.lock().panel_lines.clone()
    }
}

impl Platform for StubPlatform {
    fn has_overlay_permission(&self) -> bool {
        self.state.lock().overlay_permission
    }

    fn has_foreground_execution_rights(&self) -> bool {
        self.state.lock().foreground_rights
    }

    fn enter_foreground(&self) -> Result<(), String> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.foreground_error {
            return Err(reason.clone());
        }
        state.in_foreground = true;
        info!("Entered foreground context");
        Ok(())
    }

    fn exit_foreground(&self) {
        let mut state = self.state.lock();
        if state.in_foreground {
            state.in_foreground = false;
            info!("Left foreground context");
        }
    }

    fn attach_surface(&self, kind: SurfaceKind) -> Result<(), String> {
        let mut state = self.state.lock();
        state.attach_attempts += 1;
        if let Some(reason) = state.attach_errors.get(&kind) {
            return Err(reason.clone());
        }
        if !state.attached.contains(&kind) {
            state.attached.push(kind);
        }
        debug!("Attached {} surface", kind);
        Ok(())
    }

    fn detach_surface(&self, kind: SurfaceKind) -> Result<(), String> {
        let mut state = self.state.lock();
        state.attached.retain(|k| *k != kind);
        if kind == SurfaceKind::Panel {
            state.panel_visible = false;
        }
        // The surface is gone either way; the error only reports it
        match state.detach_errors.get(&kind) {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn manufacturer(&self) -> Option<String> {
        self.state.lock().manufacturer.clone()
    }
}

impl OverlaySurface for StubPlatform {
    fn move_control(&self, position: Point) {
        self.state.lock().control_position = Some(position);
    }

    fn place_panel(&self, position: Point) {
        self.state.lock().panel_position = Some(position);
    }

    fn set_panel_visible(&self, visible: bool) {
        self.state.lock().panel_visible = visible;
    }

    fn render_panel(&self, panel: &PanelView) {
        let lines = panel.lines();
        debug!("Panel: {}", lines.join(" | "));
        self.state.lock().panel_lines = lines;
    }
}
