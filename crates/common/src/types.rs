//! Core data types for the camscout scanning engine
//!
//! Records are plain aggregates: created once by the component that observed them and
//! never mutated afterwards. Builders consume `self` so results can be assembled
//! without intermediate clones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::rtsp_url::generate_rtsp_url;

/// Ports RTSP devices commonly listen on.
pub const DEFAULT_PORTS: [u16; 8] = [554, 8554, 7447, 5554, 88, 8000, 8080, 8888];

/// Single (address, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    #[inline]
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// An address plus the ports to try on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub ip: IpAddr,
    pub ports: Vec<u16>,
}

impl ScanTarget {
    /// Target with the given ports; an empty list falls back to [`DEFAULT_PORTS`].
    #[must_use]
    pub fn new(ip: IpAddr, ports: &[u16]) -> Self {
        let ports = if ports.is_empty() {
            DEFAULT_PORTS.to_vec()
        } else {
            ports.to_vec()
        };
        Self { ip, ports }
    }

    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.ports.iter().map(move |&p| Endpoint::new(self.ip, p))
    }
}

/// Port states returned by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
        };
        f.write_str(s)
    }
}

/// Outcome of a single connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    pub host: IpAddr,
    pub port: u16,
    pub state: PortState,
    /// Time until connect completed or failed (Duration::ZERO when unknown).
    pub latency: Duration,
}

impl PortResult {
    #[inline]
    #[must_use]
    pub fn new(host: IpAddr, port: u16, state: PortState) -> Self {
        Self {
            host,
            port,
            state,
            latency: Duration::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, PortState::Open)
    }

    #[inline]
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host, self.port)
    }
}

/// RTSP request methods the client knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Options,
    Describe,
    Setup,
    Play,
    Teardown,
}

impl Method {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Describe => "DESCRIBE",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Teardown => "TEARDOWN",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a path answered a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Ok,
    AuthError,
    Forbidden,
    NotFound,
    Error,
}

impl Classification {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Classification::Ok => "ok",
            Classification::AuthError => "auth_error",
            Classification::Forbidden => "forbidden",
            Classification::NotFound => "not_found",
            Classification::Error => "error",
        }
    }

    /// The path answered with a status proving it exists.
    #[inline]
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        matches!(
            self,
            Classification::Ok | Classification::AuthError | Classification::Forbidden
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality tier guessed from a channel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Main,
    Sub,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Main => f.write_str("main"),
            StreamType::Sub => f.write_str("sub"),
        }
    }
}

/// Media details pulled from a DESCRIBE body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpInfo {
    pub codec: Option<String>,
    pub resolution: Option<String>,
    /// `a=control` of the first video media section, if any.
    pub control: Option<String>,
}

/// Username/password pair; either half may be empty.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    #[inline]
    #[must_use]
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// Factory defaults seen across consumer cameras and DVRs, tried in order.
    #[must_use]
    pub fn common() -> Vec<Credential> {
        [
            ("admin", "admin"),
            ("admin", ""),
            ("admin", "12345"),
            ("admin", "password"),
            ("admin", "123456"),
            ("root", "root"),
            ("root", ""),
            ("root", "pass"),
            ("user", "user"),
            ("", ""),
        ]
        .iter()
        .map(|(u, p)| Credential::new(*u, *p))
        .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// One entry of the manufacturer path catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelCandidate {
    pub manufacturer_tag: String,
    pub path_template: String,
    #[serde(default)]
    pub requires_numbering: bool,
    /// High-yield entry tried in quick mode.
    #[serde(default)]
    pub quick: bool,
}

impl ChannelCandidate {
    #[must_use]
    pub fn new<T: Into<String>, P: Into<String>>(tag: T, template: P) -> Self {
        Self {
            manufacturer_tag: tag.into(),
            path_template: template.into(),
            requires_numbering: false,
            quick: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn numbered(mut self) -> Self {
        self.requires_numbering = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }
}

/// Result of one RTSP request/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtspProbeResult {
    pub host: IpAddr,
    pub port: u16,
    pub path: String,
    pub method: Method,
    pub status_code: Option<u16>,
    pub reachable: bool,
    pub classification: Classification,
    pub server_header: Option<String>,
    /// Vendor inferred from the `Server` header; advisory only.
    pub manufacturer: Option<String>,
    /// Catalog tag the path was drawn from.
    pub manufacturer_tag: Option<String>,
    pub stream_type: Option<StreamType>,
    pub credential: Option<Credential>,
    pub sdp: Option<SdpInfo>,
    pub error: Option<String>,
    pub latency: Duration,
}

impl RtspProbeResult {
    /// Fresh result; `reachable` follows the classification.
    #[must_use]
    pub fn new<P: Into<String>>(
        host: IpAddr,
        port: u16,
        path: P,
        method: Method,
        classification: Classification,
    ) -> Self {
        Self {
            host,
            port,
            path: path.into(),
            method,
            status_code: None,
            reachable: classification.is_reachable(),
            classification,
            server_header: None,
            manufacturer: None,
            manufacturer_tag: None,
            stream_type: None,
            credential: None,
            sdp: None,
            error: None,
            latency: Duration::ZERO,
        }
    }

    /// `error`-classified result for a probe that never got a usable answer.
    #[must_use]
    pub fn failed<P: Into<String>, E: Into<String>>(
        host: IpAddr,
        port: u16,
        path: P,
        method: Method,
        error: E,
    ) -> Self {
        Self::new(host, port, path, method, Classification::Error).with_error(error)
    }

    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_server(mut self, server: String, manufacturer: Option<String>) -> Self {
        self.server_header = Some(server);
        self.manufacturer = manufacturer;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_sdp(mut self, sdp: SdpInfo) -> Self {
        self.sdp = Some(sdp);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_error<E: Into<String>>(mut self, error: E) -> Self {
        self.error = Some(error.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: String, stream_type: Option<StreamType>) -> Self {
        self.manufacturer_tag = Some(tag);
        self.stream_type = stream_type;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.classification, Classification::Ok)
    }

    #[inline]
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host, self.port)
    }

    /// Playback URL for this path, with credentials when the probe used any.
    #[must_use]
    pub fn url(&self) -> String {
        let (user, pass) = self
            .credential
            .as_ref()
            .map(|c| (c.username.as_str(), c.password.as_str()))
            .unwrap_or(("", ""));
        generate_rtsp_url(&self.host.to_string(), self.port, &self.path, user, pass)
    }
}

/// Verdict of the external stream validator for one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamCheck {
    pub url: String,
    pub playable: bool,
    pub codec: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f32>,
    pub error: Option<String>,
}

impl StreamCheck {
    #[must_use]
    pub fn unavailable<U: Into<String>, E: Into<String>>(url: U, error: E) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Scan behaviour tuning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    pub port_timeout: Duration,
    pub rtsp_timeout: Duration,
    pub port_concurrency: usize,
    pub channel_concurrency: usize,
    pub rate_limit: Option<u32>, // requests per second
    pub max_channel: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            port_timeout: Duration::from_secs(2),
            rtsp_timeout: Duration::from_secs(5),
            port_concurrency: 50,
            channel_concurrency: 20,
            rate_limit: None,
            max_channel: 16,
        }
    }
}

impl ScanOptions {
    /// Fast preset: short timeouts, wider pools.
    #[inline]
    #[must_use]
    pub fn fast() -> Self {
        Self {
            port_timeout: Duration::from_millis(800),
            rtsp_timeout: Duration::from_secs(2),
            port_concurrency: 200,
            channel_concurrency: 40,
            rate_limit: None,
            max_channel: 8,
        }
    }

    /// Gentle preset for fragile DVRs: narrow pools and an explicit rate limit.
    #[inline]
    #[must_use]
    pub fn gentle() -> Self {
        Self {
            port_timeout: Duration::from_secs(3),
            rtsp_timeout: Duration::from_secs(8),
            port_concurrency: 10,
            channel_concurrency: 4,
            rate_limit: Some(20),
            max_channel: 16,
        }
    }
}

/// Counters summarizing a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub ports_probed: usize,
    pub open_ports: usize,
    pub closed_ports: usize,
    pub filtered_ports: usize,
    pub paths_probed: usize,
    pub channels_ok: usize,
    pub channels_auth: usize,
    pub errors: usize,
}

impl ScanStats {
    #[must_use]
    pub fn collect(ports: &[PortResult], probes: &[RtspProbeResult]) -> Self {
        let mut stats = Self::default();
        for p in ports {
            stats.ports_probed += 1;
            match p.state {
                PortState::Open => stats.open_ports += 1,
                PortState::Closed => stats.closed_ports += 1,
                PortState::Filtered => stats.filtered_ports += 1,
            }
        }
        for r in probes {
            stats.paths_probed += 1;
            match r.classification {
                Classification::Ok => stats.channels_ok += 1,
                Classification::AuthError | Classification::Forbidden => {
                    stats.channels_auth += 1
                }
                Classification::Error => stats.errors += 1,
                Classification::NotFound => {}
            }
        }
        stats
    }
}
