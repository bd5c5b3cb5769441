//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client, retries, circuit breaker produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - The library only emits; binaries decide where output goes
//! - Request ID is attached to every attempt's log events

pub mod logging;
pub mod metrics;
