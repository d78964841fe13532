use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

/// Three-state circuit breaker consulted before each outbound backend call
/// (§4.8). `Closed` lets calls through; consecutive failures flip it to
/// `Open`, which rejects everything until `reset_timeout` elapses and it
/// becomes `HalfOpen`, admitting a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Copy)]
enum Inner {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    success_threshold: u32,
    state: RwLock<Inner>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            success_threshold,
            state: RwLock::new(Inner::Closed),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
        }
    }

    /// Whether a call may proceed right now. `Open` transitions itself to
    /// `HalfOpen` once `reset_timeout` has elapsed, admitting exactly the
    /// caller that observes the transition.
    pub async fn permits_call(&self) -> bool {
        let current = { *self.state.read().await };

        match current {
            Inner::Closed => true,
            Inner::HalfOpen => false,
            Inner::Open { since } => {
                if since.elapsed() < self.reset_timeout {
                    false
                } else {
                    let mut state = self.state.write().await;
                    if let Inner::Open { since } = *state
                        && since.elapsed() >= self.reset_timeout
                    {
                        *state = Inner::HalfOpen;
                        self.consecutive_successes.store(0, Ordering::Relaxed);
                        return true;
                    }
                    matches!(*state, Inner::HalfOpen)
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        match *state {
            Inner::HalfOpen => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.success_threshold {
                    *state = Inner::Closed;
                    self.consecutive_failures.store(0, Ordering::Relaxed);
                    self.consecutive_successes.store(0, Ordering::Relaxed);
                }
            }
            Inner::Closed => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            Inner::Open { .. } => {}
        }
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        match *state {
            Inner::HalfOpen => {
                *state = Inner::Open { since: Instant::now() };
                self.consecutive_successes.store(0, Ordering::Relaxed);
            }
            Inner::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.failure_threshold {
                    *state = Inner::Open { since: Instant::now() };
                }
            }
            Inner::Open { .. } => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        match *self.state.read().await {
            Inner::Closed => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30), 1);

        for _ in 0..3 {
            assert!(breaker.permits_call().await);
            breaker.record_failure().await;
        }

        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(!breaker.permits_call().await);
    }

    #[tokio::test]
    async fn half_open_closes_on_success_and_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1), 1);

        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(breaker.permits_call().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);

        breaker.record_success().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
