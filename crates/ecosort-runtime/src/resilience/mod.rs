//! Resilience patterns for generator calls.
//!
//! - Circuit breaker per generation task
//! - Retry with exponential backoff for transient failures

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, GenerationTask};
pub use retry::{with_retry, RetryPolicy};
