//! Overlay Lifecycle State Machine
//!
//! Owns the floating control's phase and position, the result panel content
//! and its hide deadline, and the single active measurement session.
//!
//! The machine is pure: it consumes pointer events, timer ticks and session
//! events with an explicit `now`, and answers with [`OverlayCommand`]s for the
//! driver to carry out. Phase changes happen only through those inputs.

use super::gesture::{Gesture, GestureTracker, Point, PointerEvent};
use super::panel::PanelView;
use crate::network_analyzer::{MeasurementSession, ProbeKind, SessionEvent, SessionId, SessionState};
use crate::settings::OverlaySettings;
use log::{debug, info};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Surfaces not shown
    Hidden,
    Idle,
    Dragging,
    PanelVisible,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayState {
    pub phase: OverlayPhase,
    /// Control position; persists across gestures
    pub position: Point,
    /// When the panel hides unless tapped again
    pub panel_hide_deadline: Option<Instant>,
}

/// Side effect requested by the state machine
#[derive(Clone, Debug)]
pub enum OverlayCommand {
    MoveControl(Point),
    /// Panel anchor; follows the control at a fixed vertical offset
    PlacePanel(Point),
    ShowPanel,
    HidePanel,
    /// Panel content changed; redraw from [`OverlayController::panel`]
    RenderPanel,
    StartSession(MeasurementSession),
    CancelSession(SessionId),
}

#[derive(Clone, Debug)]
struct ActiveSession {
    id: SessionId,
    plan: Vec<ProbeKind>,
    reported: usize,
    state: SessionState,
}

pub struct OverlayController {
    state: OverlayState,
    gesture: GestureTracker,
    panel: PanelView,
    panel_hide: Duration,
    panel_offset_y: f32,
    chain_upload: bool,
    active: Option<ActiveSession>,
    next_session: u64,
}

impl OverlayController {
    pub fn new(settings: &OverlaySettings) -> Self {
        Self {
            state: OverlayState {
                phase: OverlayPhase::Hidden,
                position: Point::new(settings.initial_x, settings.initial_y),
                panel_hide_deadline: None,
            },
            gesture: GestureTracker::new(settings.drag_threshold_px),
            panel: PanelView::new(&settings.node_label, &settings.route_label),
            panel_hide: settings.panel_hide(),
            panel_offset_y: settings.panel_offset_y,
            chain_upload: settings.chain_upload,
            active: None,
            next_session: 1,
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn phase(&self) -> OverlayPhase {
        self.state.phase
    }

    pub fn position(&self) -> Point {
        self.state.position
    }

    pub fn panel(&self) -> &PanelView {
        &self.panel
    }

    /// Where the panel sits: below the control by the configured offset
    pub fn panel_position(&self) -> Point {
        self.state.position.offset(0.0, self.panel_offset_y)
    }

    fn placement(&self) -> Vec<OverlayCommand> {
        vec![
            OverlayCommand::MoveControl(self.state.position),
            OverlayCommand::PlacePanel(self.panel_position()),
        ]
    }

    pub fn is_panel_visible(&self) -> bool {
        self.state.panel_hide_deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.panel_hide_deadline
    }

    /// Id and state of the current session, if any
    pub fn active_session(&self) -> Option<(SessionId, SessionState)> {
        self.active.as_ref().map(|s| (s.id, s.state))
    }

    fn session_running(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.state.is_running())
    }

    /// Surfaces attached: Hidden -> Idle
    pub fn show(&mut self) -> Vec<OverlayCommand> {
        if self.state.phase != OverlayPhase::Hidden {
            return Vec::new();
        }
        self.state.phase = OverlayPhase::Idle;
        self.placement()
    }

    /// Tear down: cancel any session and return to Hidden
    pub fn hide(&mut self) -> Vec<OverlayCommand> {
        let mut cmds = Vec::new();
        if let Some(active) = self.active.take() {
            if active.state.is_running() {
                cmds.push(OverlayCommand::CancelSession(active.id));
            }
        }
        if self.state.panel_hide_deadline.take().is_some() {
            cmds.push(OverlayCommand::HidePanel);
        }
        self.gesture.reset();
        self.state.phase = OverlayPhase::Hidden;
        cmds
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Vec<OverlayCommand> {
        if self.state.phase == OverlayPhase::Hidden {
            return Vec::new();
        }

        match self.gesture.handle(event) {
            Gesture::Pressed | Gesture::Ignored => Vec::new(),
            Gesture::Drag { dx, dy } => {
                self.state.position = self.state.position.offset(dx, dy);
                self.state.phase = if matches!(event, PointerEvent::Up(_)) {
                    self.resting_phase()
                } else {
                    OverlayPhase::Dragging
                };
                self.placement()
            }
            Gesture::DragEnd => {
                debug!("Drag ended at ({}, {})", self.state.position.x, self.state.position.y);
                self.state.phase = self.resting_phase();
                Vec::new()
            }
            Gesture::Tap => self.on_tap(now),
        }
    }

    fn resting_phase(&self) -> OverlayPhase {
        if self.is_panel_visible() {
            OverlayPhase::PanelVisible
        } else {
            OverlayPhase::Idle
        }
    }

    fn on_tap(&mut self, now: Instant) -> Vec<OverlayCommand> {
        let mut cmds = Vec::new();
        let was_visible = self.is_panel_visible();

        // Each tap replaces the hide deadline; timers never stack.
        self.state.panel_hide_deadline = Some(now + self.panel_hide);
        self.state.phase = OverlayPhase::PanelVisible;

        if self.session_running() {
            debug!("Tap ignored for measurement: session still running");
            if !was_visible {
                cmds.push(OverlayCommand::ShowPanel);
            }
            return cmds;
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let mut session = MeasurementSession::new(id);
        if self.chain_upload {
            session = session.with_upload();
        }
        let plan = session.plan().to_vec();
        info!("Tap: starting session {}", id);

        self.panel.begin_session(&plan);
        let state = plan
            .first()
            .map_or(SessionState::Complete, |kind| SessionState::running(*kind));
        self.active = Some(ActiveSession {
            id,
            state,
            plan,
            reported: 0,
        });

        cmds.push(OverlayCommand::RenderPanel);
        if !was_visible {
            cmds.push(OverlayCommand::ShowPanel);
        }
        cmds.push(OverlayCommand::StartSession(session));
        cmds
    }

    /// Hide the panel once its deadline has passed
    pub fn poll_timeout(&mut self, now: Instant) -> Vec<OverlayCommand> {
        match self.state.panel_hide_deadline {
            Some(deadline) if deadline <= now => {}
            _ => return Vec::new(),
        }

        self.state.panel_hide_deadline = None;
        if self.state.phase == OverlayPhase::PanelVisible {
            self.state.phase = OverlayPhase::Idle;
        }

        let mut cmds = vec![OverlayCommand::HidePanel];
        // The session is discarded together with the panel
        if let Some(active) = self.active.take() {
            if active.state.is_running() {
                info!("Panel hidden; discarding running session {}", active.id);
                cmds.push(OverlayCommand::CancelSession(active.id));
            }
        }
        cmds
    }

    /// Apply a session event; events from stale sessions are dropped
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Vec<OverlayCommand> {
        let active = match self.active.as_mut() {
            Some(a) if a.id == event.session() && a.state.is_running() => a,
            _ => {
                debug!("Dropping event from stale session {}", event.session());
                return Vec::new();
            }
        };

        match event {
            SessionEvent::Progress { result, .. } => {
                active.reported += 1;
                if let Some(next) = active.plan.get(active.reported) {
                    active.state = SessionState::running(*next);
                }
                self.panel.apply(&result);
                vec![OverlayCommand::RenderPanel]
            }
            SessionEvent::Finished { session } => {
                debug!("Session {} finished", session);
                active.state = SessionState::Complete;
                Vec::new()
            }
        }
    }
}
