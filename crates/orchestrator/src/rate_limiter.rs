//! Request pacing shared by all workers of a coordinator.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as Governor};
use std::num::NonZeroU32;

pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    per_second: NonZeroU32,
}

impl RateLimiter {
    /// Limit to `requests_per_second` (values below 1 are treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Governor::direct(Quota::per_second(per_second)),
            per_second,
        }
    }

    /// Wait until the next request may be sent.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    pub fn current_rate(&self) -> u32 {
        self.per_second.get()
    }
}
