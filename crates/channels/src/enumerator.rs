//! Channel enumeration: expand the catalog into concrete paths and probe each one
//! through the coordinator pool.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, Span};

use camscout_common::{Classification, Credential, Endpoint, Method, RtspProbeResult, ScanError, WorkItem};
use camscout_fingerprint::detect_stream_type;
use camscout_orchestrator::{Coordinator, Progress};
use camscout_rtsp::{ProtocolCheck, RtspClient};

use crate::catalog::{instantiate, Catalog};

pub const DEFAULT_MAX_CHANNEL: u32 = 16;

/// Which part of the catalog to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    /// High-yield literal paths only.
    Quick,
    /// Every literal path plus every numbered template for channel 1.
    #[default]
    Full,
    /// Every numbered template for channels `1..=max`.
    Numbered { max: u32 },
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMode::Quick => f.write_str("quick"),
            DiscoveryMode::Full => f.write_str("full"),
            DiscoveryMode::Numbered { max } => write!(f, "numbered(1..={max})"),
        }
    }
}

impl FromStr for DiscoveryMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(DiscoveryMode::Quick),
            "full" => Ok(DiscoveryMode::Full),
            "numbered" => Ok(DiscoveryMode::Numbered { max: DEFAULT_MAX_CHANNEL }),
            other => Err(ScanError::invalid(format!("unknown discovery mode: {other}"))),
        }
    }
}

/// One concrete path to probe, with the catalog tag it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPath {
    pub manufacturer_tag: String,
    pub path: String,
}

/// Expand the catalog into the ordered, duplicate-free list of paths a mode probes.
/// When two entries produce the same path the first one in catalog order keeps it.
pub fn channel_candidates(catalog: &Catalog, mode: DiscoveryMode) -> Vec<PlannedPath> {
    let mut seen = HashSet::new();
    let mut plan = Vec::new();
    let mut push = |tag: &str, path: String| {
        if seen.insert(path.clone()) {
            plan.push(PlannedPath {
                manufacturer_tag: tag.to_string(),
                path,
            });
        }
    };

    for entry in catalog.entries() {
        let tag = entry.manufacturer_tag.as_str();
        let template = entry.path_template.as_str();
        match (mode, entry.requires_numbering) {
            (DiscoveryMode::Quick, false) if entry.quick => push(tag, template.to_string()),
            (DiscoveryMode::Full, false) => push(tag, template.to_string()),
            (DiscoveryMode::Full, true) => push(tag, instantiate(template, 1)),
            (DiscoveryMode::Numbered { max }, true) => {
                for channel in 1..=max {
                    push(tag, instantiate(template, channel));
                }
            }
            _ => {}
        }
    }
    plan
}

/// OPTIONS on `/` of an open port, run before any path is tried.
#[derive(Debug, Clone)]
pub struct ProtocolTarget(pub Endpoint);

impl WorkItem for ProtocolTarget {
    type Output = ProtocolCheck;

    fn fault(&self, reason: &str) -> ProtocolCheck {
        ProtocolCheck::unanswered(self.0.ip, self.0.port, reason)
    }
}

/// DESCRIBE of one path; the coordinator's unit of work during discovery.
#[derive(Debug, Clone)]
pub struct ChannelProbe {
    pub host: IpAddr,
    pub port: u16,
    pub path: String,
    pub manufacturer_tag: String,
    pub credential: Option<Credential>,
}

impl WorkItem for ChannelProbe {
    type Output = RtspProbeResult;

    fn fault(&self, reason: &str) -> RtspProbeResult {
        RtspProbeResult::failed(self.host, self.port, self.path.as_str(), Method::Describe, reason)
            .with_tag(self.manufacturer_tag.clone(), detect_stream_type(&self.path))
    }
}

/// Credential list run against one auth-protected path.
#[derive(Debug, Clone)]
pub struct CredentialProbe {
    pub previous: RtspProbeResult,
    pub credentials: Arc<Vec<Credential>>,
}

impl WorkItem for CredentialProbe {
    type Output = RtspProbeResult;

    fn fault(&self, reason: &str) -> RtspProbeResult {
        self.previous.clone().with_error(reason)
    }
}

type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

pub struct ChannelEnumerator {
    client: RtspClient,
    coordinator: Coordinator,
    on_progress: Option<ProgressFn>,
    span: Span,
}

impl ChannelEnumerator {
    pub fn new(client: RtspClient, coordinator: Coordinator) -> Self {
        Self {
            client,
            coordinator,
            on_progress: None,
            span: Span::none(),
        }
    }

    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn progress_sink(&self) -> impl Fn(Progress) + Send + Sync + 'static {
        let sink = self.on_progress.clone();
        move |p| {
            if let Some(f) = &sink {
                f(p)
            }
        }
    }

    /// Send OPTIONS to every endpoint and return the checks in input order.
    /// Ports that do not answer in RTSP come back with `is_rtsp == false`.
    #[instrument(parent = &self.span, skip(self, endpoints), fields(endpoints = endpoints.len()))]
    pub async fn confirm_rtsp(&self, endpoints: &[Endpoint]) -> Vec<ProtocolCheck> {
        let items: Vec<ProtocolTarget> = endpoints.iter().copied().map(ProtocolTarget).collect();
        let client = self.client.clone();
        let checks = self
            .coordinator
            .run(
                items,
                move |item: ProtocolTarget| {
                    let client = client.clone();
                    async move { Ok::<_, anyhow::Error>(client.check_protocol(item.0.ip, item.0.port).await) }
                },
                self.progress_sink(),
            )
            .await;

        let rtsp = checks.iter().filter(|c| c.is_rtsp).count();
        info!("{}/{} open port(s) answered OPTIONS as RTSP", rtsp, checks.len());
        checks
    }

    /// Probe every path `mode` selects from `catalog` on one (host, port).
    /// Results are sorted by (manufacturer_tag, path).
    #[instrument(parent = &self.span, skip(self, catalog, credentials))]
    pub async fn discover(
        &self,
        host: IpAddr,
        port: u16,
        catalog: &Catalog,
        credentials: Option<&Credential>,
        mode: DiscoveryMode,
    ) -> Vec<RtspProbeResult> {
        let items: Vec<ChannelProbe> = channel_candidates(catalog, mode)
            .into_iter()
            .map(|planned| ChannelProbe {
                host,
                port,
                path: planned.path,
                manufacturer_tag: planned.manufacturer_tag,
                credential: credentials.cloned(),
            })
            .collect();
        let planned = items.len();

        let client = self.client.clone();
        let mut results = self
            .coordinator
            .run(
                items,
                move |item: ChannelProbe| {
                    let client = client.clone();
                    async move {
                        let result = client
                            .send_request(item.host, item.port, Method::Describe, &item.path, item.credential.as_ref())
                            .await;
                        let stream_type = detect_stream_type(&item.path);
                        Ok::<_, anyhow::Error>(result.with_tag(item.manufacturer_tag, stream_type))
                    }
                },
                self.progress_sink(),
            )
            .await;

        sort_results(&mut results);
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let auth = results.iter().filter(|r| r.reachable && !r.is_ok()).count();
        info!(
            "{}:{} {} mode: {}/{} paths probed, {} open, {} protected",
            host,
            port,
            mode,
            results.len(),
            planned,
            ok,
            auth
        );
        results
    }

    /// Run the credential list against every `AuthError` result and return the paths
    /// that opened, sorted like [`discover`](Self::discover).
    #[instrument(parent = &self.span, skip(self, results, credentials))]
    pub async fn crack(
        &self,
        host: IpAddr,
        port: u16,
        results: &[RtspProbeResult],
        credentials: &[Credential],
    ) -> Vec<RtspProbeResult> {
        let credentials = Arc::new(credentials.to_vec());
        let items: Vec<CredentialProbe> = results
            .iter()
            .filter(|r| r.host == host && r.port == port)
            .filter(|r| r.classification == Classification::AuthError)
            .map(|r| CredentialProbe {
                previous: r.clone(),
                credentials: credentials.clone(),
            })
            .collect();
        if items.is_empty() {
            return Vec::new();
        }

        let client = self.client.clone();
        let mut cracked: Vec<RtspProbeResult> = self
            .coordinator
            .run(
                items,
                move |item: CredentialProbe| {
                    let client = client.clone();
                    async move {
                        let previous = item.previous;
                        let found = client
                            .test_credentials(previous.host, previous.port, &previous.path, &item.credentials)
                            .await;
                        Ok::<_, anyhow::Error>(match found {
                            Some(result) => {
                                let tag = previous.manufacturer_tag.clone().unwrap_or_default();
                                result.with_tag(tag, previous.stream_type)
                            }
                            None => previous,
                        })
                    }
                },
                self.progress_sink(),
            )
            .await
            .into_iter()
            .filter(|r| r.is_ok())
            .collect();

        sort_results(&mut cracked);
        info!("{}:{} credentials opened {} path(s)", host, port, cracked.len());
        cracked
    }
}

fn sort_results(results: &mut [RtspProbeResult]) {
    results.sort_by(|a, b| (&a.manufacturer_tag, &a.path).cmp(&(&b.manufacturer_tag, &b.path)));
}
