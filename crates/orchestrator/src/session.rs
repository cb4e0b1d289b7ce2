//! Scan session: identity, shared cancellation and accumulated results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Span};
use uuid::Uuid;

use camscout_common::{PortResult, RtspProbeResult, ScanStats, StreamCheck};
use crate::orchestrator::Coordinator;
use crate::progress::{Progress, ProgressTracker};

/// One end-to-end scan. Every coordinator created from the session shares its
/// cancellation flag, progress counters and logging span.
pub struct ScanSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    progress: Arc<ProgressTracker>,
    rate_limit: Option<u32>,
    span: Span,
    ports: Mutex<Vec<PortResult>>,
    probes: Mutex<Vec<RtspProbeResult>>,
    validations: Mutex<Vec<StreamCheck>>,
}

/// Everything a session produced, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub stats: ScanStats,
    pub ports: Vec<PortResult>,
    pub probes: Vec<RtspProbeResult>,
    pub validations: Vec<StreamCheck>,
}

impl SessionReport {
    pub fn open_ports(&self) -> impl Iterator<Item = &PortResult> {
        self.ports.iter().filter(|p| p.is_open())
    }

    /// Probes that answered `ok` or asked for credentials.
    pub fn reachable(&self) -> impl Iterator<Item = &RtspProbeResult> {
        self.probes.iter().filter(|p| p.reachable)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl ScanSession {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
            progress: Arc::new(ProgressTracker::default()),
            rate_limit: None,
            span: info_span!("session", id = %id),
            ports: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
            validations: Mutex::new(Vec::new()),
        }
    }

    /// Rate limit applied by every coordinator this session hands out.
    #[must_use]
    pub fn with_rate_limit(mut self, rate: Option<u32>) -> Self {
        self.rate_limit = rate;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Coordinator bound to this session's cancellation, counters and span.
    pub fn coordinator(&self, concurrency: usize) -> Coordinator {
        Coordinator::new(concurrency)
            .with_cancellation(self.cancel.clone())
            .with_rate_limit(self.rate_limit)
            .with_session_progress(self.progress.clone())
            .with_span(self.span.clone())
    }

    pub async fn record_ports(&self, results: Vec<PortResult>) {
        self.ports.lock().await.extend(results);
    }

    pub async fn record_probes(&self, results: Vec<RtspProbeResult>) {
        self.probes.lock().await.extend(results);
    }

    pub async fn record_validations(&self, results: Vec<StreamCheck>) {
        self.validations.lock().await.extend(results);
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(parent: &self.span, "cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Close the session and collect its results in a stable order.
    pub async fn finish(&self) -> SessionReport {
        let mut ports = self.ports.lock().await.clone();
        ports.sort_by_key(|p| (p.host, p.port));

        let mut probes = self.probes.lock().await.clone();
        probes.sort_by(|a, b| {
            (a.host, a.port, &a.manufacturer_tag, &a.path).cmp(&(b.host, b.port, &b.manufacturer_tag, &b.path))
        });

        let validations = self.validations.lock().await.clone();
        let stats = ScanStats::collect(&ports, &probes);

        self.progress.log_summary("session");

        SessionReport {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            cancelled: self.is_cancelled(),
            stats,
            ports,
            probes,
            validations,
        }
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}
