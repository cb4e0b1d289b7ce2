// crates/scanner_tcp/src/scanner.rs
//! TCP connect prober implementation

use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, Span};

use camscout_common::{Endpoint, PortProbe, PortResult, PortState, DEFAULT_PORTS};
use camscout_orchestrator::{Coordinator, Progress};

/// Connect timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Probe one port with a plain TCP connect bounded by `connect_timeout`.
///
/// The connection is dropped as soon as it is established; no data is exchanged.
/// Refused connections are `Closed`, everything else that fails is `Filtered`.
pub async fn probe(addr: IpAddr, port: u16, connect_timeout: Duration) -> PortResult {
    let target = SocketAddr::new(addr, port);
    let start = Instant::now();

    let state = match timeout(connect_timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            PortState::Open
        }
        Ok(Err(e)) => match e.kind() {
            ErrorKind::ConnectionRefused => PortState::Closed,
            kind => {
                debug!("{} connect failed ({:?}): {}", target, kind, e);
                PortState::Filtered
            }
        },
        Err(_) => PortState::Filtered, // timed out
    };

    PortResult::new(addr, port, state).with_latency(start.elapsed())
}

/// Connect-level prober driven through the shared coordinator pool.
#[derive(Clone)]
pub struct TcpProber {
    timeout: Duration,
    span: Span,
}

impl TcpProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `ports` on a single host; an empty list means [`DEFAULT_PORTS`].
    /// Results are sorted by port.
    pub async fn probe_ports(&self, coordinator: &Coordinator, addr: IpAddr, ports: &[u16]) -> Vec<PortResult> {
        self.probe_targets(coordinator, &[addr], ports, |_| {}).await
    }

    /// Probe the cross product of `addrs` and `ports`, sorted by (host, port).
    #[instrument(parent = &self.span, skip_all, fields(hosts = addrs.len()))]
    pub async fn probe_targets<P>(
        &self,
        coordinator: &Coordinator,
        addrs: &[IpAddr],
        ports: &[u16],
        on_progress: P,
    ) -> Vec<PortResult>
    where
        P: Fn(Progress) + Send + Sync + 'static,
    {
        let ports: &[u16] = if ports.is_empty() { &DEFAULT_PORTS } else { ports };
        let endpoints: Vec<Endpoint> = addrs
            .iter()
            .flat_map(|&ip| ports.iter().map(move |&port| Endpoint::new(ip, port)))
            .collect();

        let prober = self.clone();
        let mut results = coordinator
            .run(
                endpoints,
                move |endpoint: Endpoint| {
                    let prober = prober.clone();
                    async move { Ok::<_, anyhow::Error>(prober.probe(endpoint).await) }
                },
                on_progress,
            )
            .await;

        results.sort_by_key(|r| (r.host, r.port));
        let open = results.iter().filter(|r| r.is_open()).count();
        info!("port sweep finished: {} of {} open", open, results.len());
        results
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            span: Span::none(),
        }
    }
}

#[async_trait]
impl PortProbe for TcpProber {
    async fn probe(&self, endpoint: Endpoint) -> PortResult {
        let result = probe(endpoint.ip, endpoint.port, self.timeout).await;
        debug!(parent: &self.span, "{} -> {}", endpoint, result.state);
        result
    }

    fn name(&self) -> &str {
        "TCP Connect Prober"
    }
}
