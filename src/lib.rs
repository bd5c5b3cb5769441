//! HTTP API client with retries and a circuit breaker.

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;

pub use config::schema::ClientConfig;
pub use http::{ApiError, ApiResponse, ResilientClient};
pub use resilience::{CircuitStatus, ResilienceState};
