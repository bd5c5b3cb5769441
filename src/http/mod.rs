//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! caller → client.rs (get/post/put/delete)
//!     → request.rs (join URL, merge headers, request ID)
//!     → resilience::retries (breaker check, attempts, backoff)
//!         → transport.rs (one physical exchange per attempt)
//!     → response.rs (status, headers, body) or error.rs (typed failure)
//! ```

pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use client::ResilientClient;
pub use error::{ApiError, ApiResult, TransportError};
pub use request::{PreparedRequest, RequestDescriptor};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport};
