//! camscout common - shared types and traits
//!
//! This crate provides the record types, error taxonomy, RTSP URL helpers and the
//! traits that connect the scanning components.

pub mod error;
pub mod traits;
pub mod types;
pub mod rtsp_url;

// Re-export commonly used types
pub use error::{ScanError, ScanResult};
pub use traits::{Outcome, PortProbe, StreamValidator, WorkItem};
pub use types::{
    ChannelCandidate, Classification, Credential, Endpoint, Method, PortResult, PortState,
    RtspProbeResult, ScanOptions, ScanStats, ScanTarget, SdpInfo, StreamCheck, StreamType,
    DEFAULT_PORTS,
};
pub use rtsp_url::{generate_rtsp_url, parse_rtsp_url, validate_rtsp_url, RtspUrl, DEFAULT_RTSP_PORT};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent with every RTSP request.
pub fn user_agent() -> String {
    format!("camscout/{VERSION}")
}
