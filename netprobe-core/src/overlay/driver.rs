//! Overlay event loop
//!
//! Runs the [`OverlayController`] on a single task: pointer events, the panel
//! hide timer and session results are handled one at a time, in arrival order.
//! Probes run on their own spawned tasks, so gesture handling never waits on
//! network I/O.

use super::controller::{OverlayCommand, OverlayController};
use super::gesture::{Point, PointerEvent};
use super::panel::PanelView;
use crate::network_analyzer::{ProbeRunner, SessionEvent, SessionHandle};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Where the overlay draws. Implemented by the platform layer.
pub trait OverlaySurface: Send + Sync {
    fn move_control(&self, position: Point);
    fn place_panel(&self, position: Point);
    fn set_panel_visible(&self, visible: bool);
    fn render_panel(&self, panel: &PanelView);
}

/// Handle to a running overlay loop.
///
/// Closing (or dropping) it stops the loop, cancels any running session and
/// stops all further drawing, so late probe results are never applied.
pub struct OverlayHandle {
    pointer_tx: UnboundedSender<PointerEvent>,
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl OverlayHandle {
    /// Queue a pointer event; returns false once the loop has stopped
    pub fn send_pointer(&self, event: PointerEvent) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.pointer_tx.send(event).is_ok()
    }

    pub fn pointer_sender(&self) -> UnboundedSender<PointerEvent> {
        self.pointer_tx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.task.is_finished()
    }

    pub fn close(self) {
        // Drop does the work
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        // Aborting drops the loop's state, including any SessionHandle,
        // which aborts the in-flight probe task.
        self.task.abort();
    }
}

pub struct OverlayDriver {
    controller: OverlayController,
    runner: ProbeRunner,
    surface: Arc<dyn OverlaySurface>,
    pointer_rx: UnboundedReceiver<PointerEvent>,
    session_tx: UnboundedSender<SessionEvent>,
    session_rx: UnboundedReceiver<SessionEvent>,
    session: Option<SessionHandle>,
    closed: Arc<AtomicBool>,
}

impl OverlayDriver {
    /// Show the control and start the loop on `runtime`
    pub fn spawn(
        runtime: &Handle,
        controller: OverlayController,
        runner: ProbeRunner,
        surface: Arc<dyn OverlaySurface>,
    ) -> OverlayHandle {
        let (pointer_tx, pointer_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let driver = OverlayDriver {
            controller,
            runner,
            surface,
            pointer_rx,
            session_tx,
            session_rx,
            session: None,
            closed: Arc::clone(&closed),
        };
        let task = runtime.spawn(driver.run());

        OverlayHandle {
            pointer_tx,
            closed,
            task,
        }
    }

    async fn run(mut self) {
        let cmds = self.controller.show();
        self.execute(cmds);
        info!("Overlay loop started");

        loop {
            let deadline = self.controller.next_deadline();
            let cmds = tokio::select! {
                biased;
                event = self.pointer_rx.recv() => match event {
                    Some(event) => self.controller.handle_pointer(event, Instant::now()),
                    None => break,
                },
                Some(event) = self.session_rx.recv() => self.controller.handle_session_event(event),
                _ = sleep_until_opt(deadline) => self.controller.poll_timeout(Instant::now()),
            };
            self.execute(cmds);
        }

        let cmds = self.controller.hide();
        self.execute(cmds);
        info!("Overlay loop stopped");
    }

    fn execute(&mut self, cmds: Vec<OverlayCommand>) {
        for cmd in cmds {
            match cmd {
                OverlayCommand::StartSession(session) => {
                    // Replacing the handle aborts a previous (finished) task
                    self.session = Some(SessionHandle::spawn(
                        session,
                        self.runner.clone(),
                        self.session_tx.clone(),
                    ));
                }
                OverlayCommand::CancelSession(id) => {
                    if self.session.as_ref().is_some_and(|h| h.id() == id) {
                        if let Some(handle) = self.session.take() {
                            handle.cancel();
                        }
                    }
                }
                _ if self.closed.load(Ordering::SeqCst) => {
                    debug!("Overlay closed; skipping {:?}", cmd);
                }
                OverlayCommand::MoveControl(position) => self.surface.move_control(position),
                OverlayCommand::PlacePanel(position) => self.surface.place_panel(position),
                OverlayCommand::ShowPanel => self.surface.set_panel_visible(true),
                OverlayCommand::HidePanel => self.surface.set_panel_visible(false),
                OverlayCommand::RenderPanel => self.surface.render_panel(self.controller.panel()),
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
