use std::time::Duration;

/// Admission-control knobs: the bounded queue, the token-bucket rate limiter,
/// and the circuit breaker (§4.8).
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub queue_capacity: usize,
    pub max_wait: Duration,
    pub workers: usize,
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_wait: Duration::from_secs(30),
            workers: 16,
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per `window`.
    pub requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Not individually configurable via environment variables per spec §6
/// (only `CIRCUIT_BREAKER_ENABLED` is named); the thresholds below are fixed
/// defaults.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}
