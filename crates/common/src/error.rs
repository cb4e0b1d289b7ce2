//! Error types for camscout
//!
//! Only specification-level faults reach the caller as errors. Unreachable hosts and
//! malformed responses are recorded inside result records instead.

use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Bad network or URL syntax; raised before any network activity.
    #[error("Invalid specification: {0}")]
    InvalidSpecification(String),

    #[error("Unreachable: {0}")]
    Unreachable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An external collaborator (e.g. the stream validator) is not usable.
    #[error("Capability unavailable: {0}")]
    Capability(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScanError {
    #[inline]
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ScanError::InvalidSpecification(msg.into())
    }

    /// True for faults that must stop the caller before a scan starts.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, ScanError::InvalidSpecification(_) | ScanError::Config(_))
    }
}

/// Result type alias for camscout operations
pub type ScanResult<T> = Result<T, ScanError>;
