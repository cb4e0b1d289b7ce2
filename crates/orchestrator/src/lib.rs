//! Orchestrator - bounded work distribution and scan sessions

mod orchestrator;
mod progress;
mod rate_limiter;
mod session;

pub use orchestrator::{Coordinator, CHANNEL_SCAN_CONCURRENCY, PORT_SCAN_CONCURRENCY};
pub use progress::{Progress, ProgressTracker};
pub use rate_limiter::RateLimiter;
pub use session::{ScanSession, SessionReport};
