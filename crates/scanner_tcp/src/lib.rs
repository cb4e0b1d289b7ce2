//! TCP connect prober for RTSP-family ports.

mod scanner;

pub use scanner::{probe, TcpProber, DEFAULT_CONNECT_TIMEOUT};
