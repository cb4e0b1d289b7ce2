//! Core traits for camscout components
//!
//! The coordinator only knows about [`WorkItem`] and [`Outcome`]; probers and the stream
//! validator are plugged in behind the async traits below.

use crate::error::ScanResult;
use crate::types::{
    Credential, Endpoint, PortResult, PortState, RtspProbeResult, StreamCheck,
};
use async_trait::async_trait;

/// Connect-level prober for a single endpoint.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Probe one endpoint. Closed and filtered ports are results, not errors.
    async fn probe(&self, endpoint: Endpoint) -> PortResult;

    /// Prober name/identifier
    fn name(&self) -> &str;
}

/// External playback check, e.g. an ffprobe wrapper.
#[async_trait]
pub trait StreamValidator: Send + Sync {
    async fn verify_stream(
        &self,
        url: &str,
        credential: Option<&Credential>,
    ) -> ScanResult<StreamCheck>;

    fn name(&self) -> &str;

    /// Check if the validator can run on this system
    fn is_available(&self) -> bool {
        true
    }
}

/// Result type whose "interesting" instances are counted in progress reports.
pub trait Outcome {
    fn is_match(&self) -> bool;
}

impl Outcome for PortResult {
    fn is_match(&self) -> bool {
        self.is_open()
    }
}

impl Outcome for RtspProbeResult {
    fn is_match(&self) -> bool {
        self.reachable
    }
}

impl Outcome for StreamCheck {
    fn is_match(&self) -> bool {
        self.playable
    }
}

/// Independent unit of work dispatched through the coordinator's pool.
pub trait WorkItem: Clone + Send + 'static {
    type Output: Outcome + Send + 'static;

    /// Result recorded in place of the real one when the worker for this item faults.
    fn fault(&self, reason: &str) -> Self::Output;
}

impl WorkItem for Endpoint {
    type Output = PortResult;

    fn fault(&self, _reason: &str) -> PortResult {
        PortResult::new(self.ip, self.port, PortState::Filtered)
    }
}
