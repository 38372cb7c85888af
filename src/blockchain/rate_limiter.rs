//! Shared admission gate in front of every outbound RPC call.
//!
//! A GCRA limiter from `governor`: a burst of `capacity` calls is admitted
//! immediately and one more cell becomes available every `window / capacity`.
//! Availability is derived from elapsed time on each request, so there is no
//! background refill task and concurrent waiters never overdraw the bucket.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::trace;

pub struct AdmissionGate {
    limiter: DefaultDirectRateLimiter,
    capacity: u32,
    window: Duration,
}

/// Outcome of acquiring a token, used for rate-limit accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Immediate,
    Delayed,
}

impl AdmissionGate {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(capacity.max(1)).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_nanos(1));

        // with_period only refuses a zero period, which the max() above rules out
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::direct(quota),
            capacity: burst.get(),
            window,
        }
    }

    /// Take one token, suspending until the deficit has been refilled.
    pub async fn acquire(&self) -> Admission {
        if self.limiter.check().is_ok() {
            return Admission::Immediate;
        }

        trace!("Admission gate exhausted, waiting for refill");
        self.limiter.until_ready().await;
        Admission::Delayed
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time between two refilled tokens.
    pub fn refill_interval(&self) -> Duration {
        self.window / self.capacity
    }
}
