//! Measurement Session
//!
//! One user-triggered sequence of probes. Probes run strictly in order
//! (latency, then download, then upload when requested); each result is
//! reported as soon as it is produced. A failed probe is terminal for that
//! probe only and never aborts the rest of the session.

use super::client::build_client;
use super::latency_test::measure_latency;
use super::throughput_test::{measure_download, measure_upload, ThroughputParams};
use super::types::{ProbeKind, ProbeResult, SessionId, SessionState};
use crate::error::NetProbeResult;
use crate::settings::{NetProbeSettings, ProbeTargets, ProbeTimeouts};
use log::{debug, info};
use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Runs individual probes against the configured endpoints.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct ProbeRunner {
    client: Client,
    targets: ProbeTargets,
    timeouts: ProbeTimeouts,
}

impl ProbeRunner {
    pub fn new(settings: &NetProbeSettings) -> NetProbeResult<Self> {
        settings.validate()?;
        let client = build_client(&settings.timeouts)?;
        Ok(Self::with_client(client, settings))
    }

    /// Use a caller-built client; `settings` are taken as already validated
    pub fn with_client(client: Client, settings: &NetProbeSettings) -> Self {
        Self {
            client,
            targets: settings.targets.clone(),
            timeouts: settings.timeouts.clone(),
        }
    }

    pub async fn latency(&self) -> ProbeResult {
        measure_latency(&self.client, &self.targets.latency_url, self.timeouts.read()).await
    }

    pub async fn download(&self) -> ProbeResult {
        let url = self.targets.download_url_with_size();
        measure_download(&self.client, &url, &self.throughput_params()).await
    }

    pub async fn upload(&self) -> ProbeResult {
        measure_upload(&self.client, &self.targets.upload_url, &self.throughput_params()).await
    }

    pub async fn run_probe(&self, kind: ProbeKind) -> ProbeResult {
        match kind {
            ProbeKind::Latency => self.latency().await,
            ProbeKind::DownloadThroughput => self.download().await,
            ProbeKind::UploadThroughput => self.upload().await,
        }
    }

    fn throughput_params(&self) -> ThroughputParams {
        ThroughputParams {
            window: self.timeouts.window(),
            read_timeout: self.timeouts.read(),
            chunk_bytes: self.timeouts.chunk_bytes,
        }
    }
}

/// State of one measurement session
#[derive(Clone, Debug)]
pub struct MeasurementSession {
    id: SessionId,
    started_at: chrono::DateTime<chrono::Utc>,
    state: SessionState,
    plan: Vec<ProbeKind>,
    results: Vec<ProbeResult>,
}

impl MeasurementSession {
    /// Session running the default plan: latency then download
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            started_at: chrono::Utc::now(),
            state: SessionState::Idle,
            plan: vec![ProbeKind::Latency, ProbeKind::DownloadThroughput],
            results: Vec::new(),
        }
    }

    /// Also chain the upload probe after download
    pub fn with_upload(mut self) -> Self {
        if !self.plan.contains(&ProbeKind::UploadThroughput) {
            self.plan.push(ProbeKind::UploadThroughput);
        }
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn plan(&self) -> &[ProbeKind] {
        &self.plan
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    /// Run every planned probe in order, reporting each result via `on_progress`
    pub async fn run<F>(&mut self, runner: &ProbeRunner, mut on_progress: F) -> &[ProbeResult]
    where
        F: FnMut(&ProbeResult),
    {
        info!("Session {} starting ({} probes)", self.id, self.plan.len());

        let plan = self.plan.clone();
        for kind in plan {
            self.run_one(runner, kind, &mut on_progress).await;
        }

        self.state = SessionState::Complete;
        info!("Session {} complete", self.id);
        &self.results
    }

    /// Run the upload probe on its own, outside the default plan
    pub async fn run_upload<F>(&mut self, runner: &ProbeRunner, mut on_progress: F) -> ProbeResult
    where
        F: FnMut(&ProbeResult),
    {
        let result = self.run_one(runner, ProbeKind::UploadThroughput, &mut on_progress).await;
        self.state = SessionState::Complete;
        result
    }

    async fn run_one<F>(&mut self, runner: &ProbeRunner, kind: ProbeKind, on_progress: &mut F) -> ProbeResult
    where
        F: FnMut(&ProbeResult),
    {
        self.state = SessionState::running(kind);
        debug!("Session {}: {}", self.id, self.state.label());

        let result = runner.run_probe(kind).await;
        on_progress(&result);
        self.results.push(result.clone());
        result
    }
}

/// Message sent from a spawned session back to its owner
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A probe finished
    Progress { session: SessionId, result: ProbeResult },
    /// All planned probes finished
    Finished { session: SessionId },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SessionEvent::Progress { session, .. } | SessionEvent::Finished { session } => *session,
        }
    }
}

/// A session running on the worker runtime.
///
/// Dropping or cancelling the handle aborts the task, which drops any
/// in-flight request; no further events are sent after that.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn spawn(
        mut session: MeasurementSession,
        runner: ProbeRunner,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        let id = session.id();
        let task = tokio::spawn(async move {
            let progress_tx = events.clone();
            session
                .run(&runner, |result| {
                    let _ = progress_tx.send(SessionEvent::Progress {
                        session: id,
                        result: result.clone(),
                    });
                })
                .await;
            let _ = events.send(SessionEvent::Finished { session: id });
        });
        Self { id, task }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        debug!("Cancelling session {}", self.id);
        // Drop aborts the task
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
