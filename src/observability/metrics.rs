//! Metrics collection.
//!
//! # Metrics
//! - `client_requests_total` (counter): logical requests by method, outcome
//! - `client_attempts_total` (counter): transport invocations by method
//! - `client_retries_total` (counter): retries scheduled by method
//! - `client_circuit_rejections_total` (counter): calls refused by the breaker
//! - `client_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; the embedding application
//!   installs whichever recorder/exporter it wants
//! - Without a recorder every call is a no-op

use crate::resilience::circuit_breaker::CircuitStatus;

/// Record the terminal outcome of a logical request.
pub fn record_request(method: &str, outcome: &'static str) {
    metrics::counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one physical transport invocation.
pub fn record_attempt(method: &str) {
    metrics::counter!("client_attempts_total", "method" => method.to_string()).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry(method: &str) {
    metrics::counter!("client_retries_total", "method" => method.to_string()).increment(1);
}

/// Record a call refused by the circuit breaker.
pub fn record_circuit_rejection() {
    metrics::counter!("client_circuit_rejections_total").increment(1);
}

/// Record a breaker state transition.
pub fn record_circuit_state(status: CircuitStatus) {
    let value = match status {
        CircuitStatus::Closed => 0.0,
        CircuitStatus::HalfOpen => 1.0,
        CircuitStatus::Open => 2.0,
    };
    metrics::gauge!("client_circuit_state").set(value);
}
