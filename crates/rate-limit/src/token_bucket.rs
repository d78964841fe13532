use std::{
    num::NonZeroU32,
    time::Duration,
};

use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};

/// Token bucket gating `/v1/messages` only; health, metrics, and root bypass
/// it entirely (§4.8).
pub struct TokenBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TokenBucket {
    /// `requests` tokens refill over `window`, with burst capacity equal to
    /// `requests` (a back-to-back burst up to the window's full allowance is
    /// permitted, matching §8's "N > b back-to-back requests" property).
    pub fn new(requests: u32, window: Duration) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::with_period(window / requests.get()).unwrap_or(Quota::per_second(requests));
        let quota = quota.allow_burst(requests);

        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Attempts to consume one token. Returns the delay until the next token
    /// would be available when rejected, for a `Retry-After` header.
    pub fn check(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exactly_burst_then_rejects() {
        let bucket = TokenBucket::new(3, Duration::from_secs(60));

        assert!(bucket.check().is_ok());
        assert!(bucket.check().is_ok());
        assert!(bucket.check().is_ok());
        assert!(bucket.check().is_err());
    }
}
