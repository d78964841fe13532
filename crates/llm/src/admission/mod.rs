//! Rate limiter, circuit breaker, and bounded queue gating `/v1/messages` (§4.8).

mod queue;

use std::collections::HashMap;

use config::ProviderKind;
use rate_limit::{CircuitBreaker, TokenBucket};

use crate::error::{LlmError, Result};

pub use queue::AdmissionQueue;

/// One breaker per backend provider kind, so a failing primary provider
/// doesn't trip the breaker for a healthy fallback provider.
pub struct Admission {
    rate_limiter: Option<TokenBucket>,
    circuit_breakers: Option<HashMap<ProviderKind, CircuitBreaker>>,
}

const ALL_PROVIDER_KINDS: &[ProviderKind] = &[
    ProviderKind::OpenAi,
    ProviderKind::OpenRouter,
    ProviderKind::Azure,
    ProviderKind::Custom,
    ProviderKind::Anthropic,
];

impl Admission {
    pub fn new(config: &config::AdmissionConfig) -> Self {
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| TokenBucket::new(config.rate_limit.requests, config.rate_limit.window));

        let circuit_breakers = config.circuit_breaker.enabled.then(|| {
            ALL_PROVIDER_KINDS
                .iter()
                .map(|&kind| {
                    let breaker = CircuitBreaker::new(
                        config.circuit_breaker.failure_threshold,
                        config.circuit_breaker.reset_timeout,
                        config.circuit_breaker.success_threshold,
                    );
                    (kind, breaker)
                })
                .collect()
        });

        Self {
            rate_limiter,
            circuit_breakers,
        }
    }

    /// Checks the token bucket. Only `/v1/messages` calls this (§4.8);
    /// health/metrics/root never do.
    pub fn check_rate_limit(&self) -> Result<()> {
        let Some(limiter) = &self.rate_limiter else { return Ok(()) };

        limiter
            .check()
            .map_err(|retry_after| LlmError::RateLimitExceeded { retry_after })
    }

    /// Whether an outbound call to `kind` may proceed right now.
    pub async fn permits_call(&self, kind: ProviderKind) -> bool {
        match self.breaker_for(kind) {
            Some(breaker) => breaker.permits_call().await,
            None => true,
        }
    }

    pub async fn record_success(&self, kind: ProviderKind) {
        if let Some(breaker) = self.breaker_for(kind) {
            breaker.record_success().await;
        }
    }

    pub async fn record_failure(&self, kind: ProviderKind) {
        if let Some(breaker) = self.breaker_for(kind) {
            breaker.record_failure().await;
        }
    }

    fn breaker_for(&self, kind: ProviderKind) -> Option<&CircuitBreaker> {
        self.circuit_breakers.as_ref().and_then(|breakers| breakers.get(&kind))
    }
}

/// Sentinel used when the breaker is open: a retryable-shaped error so the
/// router's fallback path treats it the same as a timeout or 5xx (§4.6, §4.8).
pub fn circuit_open_error() -> LlmError {
    LlmError::Overloaded("circuit breaker is open".to_string())
}
