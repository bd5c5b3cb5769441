//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical request:
//!     → circuit_breaker.rs (admit, or fail fast while open)
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → retries.rs (classify outcome, record it, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Connection errors and 5xx are retryable; 4xx never is
//! - Jittered backoff prevents thundering herd
//! - The breaker is the only shared mutable state

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::{calculate_backoff, Backoff, ExponentialBackoff, NoBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitOpen, CircuitStatus, Permit, ResilienceState};
pub use retries::{classify, classify_status, AttemptOutcome, Classification, Classifier, RetryPolicy};
