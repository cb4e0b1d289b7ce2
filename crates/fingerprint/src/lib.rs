//! Fingerprint Engine - camera vendor and stream tier identification
//!
//! This module provides:
//! - Manufacturer inference from RTSP `Server` headers
//! - Main/sub stream detection from channel paths
//! - Well-known service names for RTSP-family ports

mod vendor_detector;

pub use vendor_detector::{
    detect_manufacturer,
    detect_stream_type,
    port_service,
    server_version,
};
