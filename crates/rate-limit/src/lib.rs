//! Admission-control primitives shared by the server and llm crates: a
//! token-bucket rate limiter and a three-state circuit breaker (§4.8).

mod circuit_breaker;
mod token_bucket;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use token_bucket::TokenBucket;
