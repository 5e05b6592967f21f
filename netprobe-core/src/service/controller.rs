//! Service Lifecycle Controller
//!
//! Gates the overlay behind platform permissions:
//!
//! ```text
//! Created -> AwaitingPermission -> ForegroundActive -> OverlaysAttached
//!                  |                      |
//!                  +-------> Failed <-----+
//! ```
//!
//! Notify-only mode stops at `ForegroundActive` and reports ready without
//! attaching anything. `Failed` and `Stopped` are terminal; the host creates a
//! new controller to try again.

use super::events::{StatusEvent, StatusReporter};
use super::platform::{Platform, SurfaceKind};
use super::watchdog::{wait_for_status, HostNotice};
use crate::error::{NetProbeError, NetProbeResult};
use crate::error_messages::user_friendly_error;
use crate::network_analyzer::ProbeRunner;
use crate::overlay::{OverlayController, OverlayDriver, OverlayHandle, OverlaySurface, PointerEvent};
use crate::settings::{NetProbeSettings, PermissionEnforcement};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Foreground context plus both overlay surfaces
    #[default]
    Full,
    /// Foreground context only; used to diagnose foreground promotion
    NotifyOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServicePhase {
    Created,
    AwaitingPermission,
    ForegroundActive,
    OverlaysAttached,
    Failed,
    Stopped,
}

impl ServicePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServicePhase::Failed | ServicePhase::Stopped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServicePhase::Created => "Created",
            ServicePhase::AwaitingPermission => "Checking permissions",
            ServicePhase::ForegroundActive => "Running",
            ServicePhase::OverlaysAttached => "Overlay active",
            ServicePhase::Failed => "Failed",
            ServicePhase::Stopped => "Stopped",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub phase: ServicePhase,
    pub mode: ServiceMode,
}

const NOTIFY_ONLY_READY: &str = "notify-only: foreground context active";

pub struct ServiceController<P: Platform> {
    platform: Arc<P>,
    settings: NetProbeSettings,
    runner: ProbeRunner,
    state: ServiceState,
    runtime: Option<Handle>,
    overlay: Option<OverlayHandle>,
}

impl<P: Platform> ServiceController<P> {
    pub fn new(platform: Arc<P>, settings: NetProbeSettings) -> NetProbeResult<Self> {
        let runner = ProbeRunner::new(&settings)?;
        Self::with_runner(platform, settings, runner)
    }

    /// Use an existing runner (and its HTTP client) for the overlay's probes.
    ///
    /// The overlay loop will run on the tokio runtime current at this call,
    /// if any; see [`with_runtime`](Self::with_runtime).
    pub fn with_runner(
        platform: Arc<P>,
        settings: NetProbeSettings,
        runner: ProbeRunner,
    ) -> NetProbeResult<Self> {
        settings.validate()?;
        Ok(Self {
            platform,
            settings,
            runner,
            state: ServiceState {
                phase: ServicePhase::Created,
                mode: ServiceMode::Full,
            },
            runtime: Handle::try_current().ok(),
            overlay: None,
        })
    }

    /// Run the overlay loop on `runtime`
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn phase(&self) -> ServicePhase {
        self.state.phase
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Sender for pointer events on the control; `None` unless attached
    pub fn pointer_events(&self) -> Option<UnboundedSender<PointerEvent>> {
        self.overlay.as_ref().map(|o| o.pointer_sender())
    }

    /// Forward one pointer event to the overlay loop
    pub fn send_pointer(&self, event: PointerEvent) -> bool {
        self.overlay.as_ref().is_some_and(|o| o.send_pointer(event))
    }

    /// Handle a start signal from the host.
    ///
    /// The returned receiver yields exactly one status for this attempt. A
    /// full start without a runtime to run the overlay on reports `Failed`.
    pub fn start(&mut self, mode: ServiceMode) -> oneshot::Receiver<StatusEvent> {
        let (reporter, rx) = StatusReporter::new();
        let event = self.try_start(mode);
        reporter.report(event);
        rx
    }

    /// Start and wait up to `service.ready_timeout_ms` for the status
    pub async fn start_and_wait(&mut self, mode: ServiceMode) -> HostNotice {
        let rx = self.start(mode);
        wait_for_status(rx, self.settings.service.ready_timeout()).await
    }

    fn try_start(&mut self, mode: ServiceMode) -> StatusEvent {
        match self.state.phase {
            ServicePhase::Failed | ServicePhase::Stopped => {
                warn!("Start ignored: service already {}", self.state.phase.label());
                return self.status_for(&NetProbeError::ServiceStopped);
            }
            ServicePhase::OverlaysAttached => {
                info!("Start ignored: overlay already attached");
                return StatusEvent::ready();
            }
            ServicePhase::Created | ServicePhase::AwaitingPermission => {
                self.state.mode = mode;
                if let Err(e) = self.promote_to_foreground() {
                    return self.fail(e);
                }
            }
            ServicePhase::ForegroundActive => {
                self.state.mode = mode;
            }
        }

        match mode {
            ServiceMode::NotifyOnly => {
                info!("Notify-only mode: skipping overlay");
                StatusEvent::ready_with(NOTIFY_ONLY_READY)
            }
            ServiceMode::Full => match self.attach_overlays() {
                Ok(()) => StatusEvent::ready(),
                Err(e) => self.fail(e),
            },
        }
    }

    fn promote_to_foreground(&mut self) -> NetProbeResult<()> {
        self.state.phase = ServicePhase::AwaitingPermission;

        if !self.platform.has_foreground_execution_rights() {
            match self.settings.service.permission_enforcement {
                PermissionEnforcement::Strict => {
                    return Err(NetProbeError::PermissionDenied(
                        "missing foreground execution rights".to_string(),
                    ));
                }
                PermissionEnforcement::BestEffort => {
                    warn!("Foreground execution rights missing; trying anyway");
                }
            }
        }

        self.platform.enter_foreground().map_err(|reason| {
            NetProbeError::PermissionDenied(format!("foreground promotion refused: {}", reason))
        })?;

        self.state.phase = ServicePhase::ForegroundActive;
        info!("Foreground context established");
        Ok(())
    }

    fn attach_overlays(&mut self) -> NetProbeResult<()> {
        // Checked on every attempt; the user may have revoked it since
        if !self.platform.has_overlay_permission() {
            match self.settings.service.permission_enforcement {
                PermissionEnforcement::Strict => {
                    return Err(NetProbeError::PermissionDenied(
                        "missing overlay permission".to_string(),
                    ));
                }
                PermissionEnforcement::BestEffort => {
                    warn!("Overlay permission missing; trying anyway");
                }
            }
        }

        let Some(runtime) = self.runtime.clone() else {
            return Err(NetProbeError::Runtime(
                "start called outside a tokio runtime".to_string(),
            ));
        };

        let mut attached = Vec::with_capacity(SurfaceKind::ALL.len());
        for kind in SurfaceKind::ALL {
            if let Err(reason) = self.platform.attach_surface(kind) {
                self.detach(&attached);
                return Err(NetProbeError::SurfaceAttach {
                    surface: kind,
                    reason,
                });
            }
            attached.push(kind);
        }

        self.state.phase = ServicePhase::OverlaysAttached;
        let surface: Arc<dyn OverlaySurface> = self.platform.clone();
        self.overlay = Some(OverlayDriver::spawn(
            &runtime,
            OverlayController::new(&self.settings.overlay),
            self.runner.clone(),
            surface,
        ));
        info!("Overlay attached");
        Ok(())
    }

    /// Best-effort detach in reverse attach order; failures are only logged
    fn detach(&self, kinds: &[SurfaceKind]) {
        for kind in kinds.iter().rev() {
            if let Err(reason) = self.platform.detach_surface(*kind) {
                warn!("Failed to detach {} surface: {}", kind, reason);
            }
        }
    }

    fn fail(&mut self, e: NetProbeError) -> StatusEvent {
        error!("Service start failed: {}", e);
        self.state.phase = ServicePhase::Failed;
        self.platform.exit_foreground();
        self.status_for(&e)
    }

    /// Exact message for the host; fatal errors also carry user-facing text
    fn status_for(&self, e: &NetProbeError) -> StatusEvent {
        let message = match e {
            NetProbeError::PermissionDenied(msg) => msg.clone(),
            other => other.to_string(),
        };
        let event = StatusEvent::failed(message);
        if e.is_fatal() {
            let manufacturer = self.platform.manufacturer();
            event.with_hint(user_friendly_error(e, manufacturer.as_deref()))
        } else {
            event
        }
    }

    /// Tear down: cancel any session, detach surfaces, leave the foreground
    pub fn stop(&mut self) {
        let phase = self.state.phase;
        if phase.is_terminal() {
            return;
        }

        // Closing the loop first stops drawing before the surfaces go away
        if let Some(overlay) = self.overlay.take() {
            overlay.close();
        }
        if phase == ServicePhase::OverlaysAttached {
            self.detach(&SurfaceKind::ALL);
        }
        if matches!(
            phase,
            ServicePhase::ForegroundActive | ServicePhase::OverlaysAttached
        ) {
            self.platform.exit_foreground();
        }

        self.state.phase = ServicePhase::Stopped;
        info!("Service stopped");
    }
}

impl<P: Platform> Drop for ServiceController<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::events::Status;
    use crate::service::platform::StubPlatform;

    fn controller(platform: &Arc<StubPlatform>) -> ServiceController<StubPlatform> {
        ServiceController::new(Arc::clone(platform), NetProbeSettings::default()).unwrap()
    }

    fn best_effort(platform: &Arc<StubPlatform>) -> ServiceController<StubPlatform> {
        let mut settings = NetProbeSettings::default();
        settings.service.permission_enforcement = PermissionEnforcement::BestEffort;
        ServiceController::new(Arc::clone(platform), settings).unwrap()
    }

    fn status(mut rx: oneshot::Receiver<StatusEvent>) -> StatusEvent {
        rx.try_recv().unwrap()
    }

    #[tokio::test]
    async fn test_full_start_attaches_both_surfaces() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Ready);
        assert_eq!(svc.phase(), ServicePhase::OverlaysAttached);
        assert_eq!(
            platform.attached(),
            vec![SurfaceKind::Control, SurfaceKind::Panel]
        );
        assert!(platform.is_foreground());
        assert!(svc.pointer_events().is_some());
    }

    #[tokio::test]
    async fn test_missing_overlay_permission_fails() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_overlay_permission(false);
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(event.message.as_deref(), Some("missing overlay permission"));
        assert!(event.hint.is_some());
        assert_eq!(svc.phase(), ServicePhase::Failed);
        assert!(platform.attached().is_empty());
        assert_eq!(platform.attach_attempts(), 0);
        assert!(!platform.is_foreground());
    }

    #[tokio::test]
    async fn test_missing_foreground_rights_is_terminal() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_foreground_rights(false);
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::NotifyOnly));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(
            event.message.as_deref(),
            Some("missing foreground execution rights")
        );
        assert_eq!(svc.phase(), ServicePhase::Failed);
        assert!(!platform.is_foreground());
    }

    #[tokio::test]
    async fn test_foreground_refusal_is_terminal() {
        let platform = Arc::new(StubPlatform::new());
        platform.fail_foreground("notification permission denied");
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert!(event
            .message
            .unwrap()
            .contains("notification permission denied"));
        assert_eq!(platform.attach_attempts(), 0);
    }

    #[tokio::test]
    async fn test_control_attach_failure() {
        let platform = Arc::new(StubPlatform::new());
        platform.fail_attach(SurfaceKind::Control, "BadTokenException");
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(
            event.message.as_deref(),
            Some("Failed to attach control surface: BadTokenException")
        );
        assert!(platform.attached().is_empty());
        assert_eq!(svc.phase(), ServicePhase::Failed);
    }

    #[tokio::test]
    async fn test_panel_attach_failure_detaches_control() {
        let platform = Arc::new(StubPlatform::new());
        platform.fail_attach(SurfaceKind::Panel, "window limit reached");
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(
            event.message.as_deref(),
            Some("Failed to attach panel surface: window limit reached")
        );
        assert!(platform.attached().is_empty());
        assert!(!platform.is_foreground());
        assert!(svc.pointer_events().is_none());
    }

    #[tokio::test]
    async fn test_notify_only_reports_ready_without_surfaces() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_overlay_permission(false);
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::NotifyOnly));
        assert_eq!(event.status, Status::Ready);
        assert_eq!(svc.phase(), ServicePhase::ForegroundActive);
        assert_eq!(svc.state().mode, ServiceMode::NotifyOnly);
        assert_eq!(platform.attach_attempts(), 0);
        assert!(platform.is_foreground());
    }

    #[tokio::test]
    async fn test_repeated_start_is_noop() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);

        assert!(status(svc.start(ServiceMode::Full)).is_ready());
        assert!(status(svc.start(ServiceMode::Full)).is_ready());
        assert_eq!(platform.attach_attempts(), 2);
        assert_eq!(svc.phase(), ServicePhase::OverlaysAttached);
    }

    #[tokio::test]
    async fn test_overlay_permission_rechecked_after_notify_only() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);

        assert!(status(svc.start(ServiceMode::NotifyOnly)).is_ready());
        platform.set_overlay_permission(false);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.message.as_deref(), Some("missing overlay permission"));
        assert_eq!(svc.phase(), ServicePhase::Failed);
    }

    #[tokio::test]
    async fn test_start_after_failure_reports_stopped() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_overlay_permission(false);
        let mut svc = controller(&platform);
        status(svc.start(ServiceMode::Full));

        platform.set_overlay_permission(true);
        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(event.message.as_deref(), Some("service stopped"));
        assert!(event.hint.unwrap().contains("start it again"));
        assert_eq!(platform.attach_attempts(), 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let platform = Arc::new(StubPlatform::new());
        let mut settings = NetProbeSettings::default();
        settings.timeouts.window_ms = 0;
        let result = ServiceController::new(Arc::clone(&platform), settings);
        assert!(matches!(result, Err(NetProbeError::InvalidConfig(_))));
    }

    #[test]
    fn test_full_start_without_runtime_fails() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert!(event.message.unwrap().starts_with("No async runtime available"));
        assert_eq!(svc.phase(), ServicePhase::Failed);
        assert_eq!(platform.attach_attempts(), 0);
        assert!(!platform.is_foreground());
    }

    #[test]
    fn test_explicit_runtime_runs_overlay() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform).with_runtime(rt.handle().clone());

        assert!(status(svc.start(ServiceMode::Full)).is_ready());
        assert_eq!(svc.phase(), ServicePhase::OverlaysAttached);
        assert!(svc.send_pointer(PointerEvent::Down(crate::overlay::Point::new(0.0, 0.0))));
        svc.stop();
        assert!(platform.attached().is_empty());
    }

    #[tokio::test]
    async fn test_start_and_wait() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);
        assert_eq!(svc.start_and_wait(ServiceMode::Full).await, HostNotice::Ready);

        let denied = Arc::new(StubPlatform::new());
        denied.set_overlay_permission(false);
        let mut svc = controller(&denied);
        assert_eq!(
            svc.start_and_wait(ServiceMode::Full).await,
            HostNotice::Failed("missing overlay permission".to_string())
        );
    }

    #[tokio::test]
    async fn test_best_effort_falls_through_missing_permissions() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_overlay_permission(false);
        platform.set_foreground_rights(false);
        let mut svc = best_effort(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert!(event.is_ready());
        assert_eq!(svc.phase(), ServicePhase::OverlaysAttached);
    }

    #[tokio::test]
    async fn test_best_effort_platform_refusal_still_fails() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_overlay_permission(false);
        platform.fail_attach(SurfaceKind::Control, "permission denied for window type");
        let mut svc = best_effort(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert_eq!(event.status, Status::Failed);
        assert_eq!(svc.phase(), ServicePhase::Failed);
    }

    #[tokio::test]
    async fn test_stop_detaches_and_swallows_errors() {
        let platform = Arc::new(StubPlatform::new());
        let mut svc = controller(&platform);
        status(svc.start(ServiceMode::Full));

        platform.fail_detach(SurfaceKind::Panel, "already removed");
        svc.stop();
        assert_eq!(svc.phase(), ServicePhase::Stopped);
        assert!(platform.attached().is_empty());
        assert!(!platform.is_foreground());
        assert!(!svc.send_pointer(PointerEvent::Down(crate::overlay::Point::new(0.0, 0.0))));
    }

    #[tokio::test]
    async fn test_drop_tears_down() {
        let platform = Arc::new(StubPlatform::new());
        {
            let mut svc = controller(&platform);
            status(svc.start(ServiceMode::Full));
        }
        assert!(platform.attached().is_empty());
        assert!(!platform.is_foreground());
    }

    #[tokio::test]
    async fn test_xiaomi_hint() {
        let platform = Arc::new(StubPlatform::new());
        platform.set_manufacturer("Xiaomi");
        platform.set_overlay_permission(false);
        let mut svc = controller(&platform);

        let event = status(svc.start(ServiceMode::Full));
        assert!(event.hint.unwrap().contains("MIUI"));
    }
}
