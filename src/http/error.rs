//! Error taxonomy for API calls.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure raised by the transport before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, reset, or name resolution failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response within the per-attempt deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other I/O or protocol failure while exchanging bytes.
    #[error("transport error: {0}")]
    Io(String),
}

/// Errors surfaced by the client facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure on the last attempt. Retryable.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 5xx response on the last attempt. Retryable.
    #[error("server error {status}")]
    Server { status: StatusCode, body: String },

    /// 4xx response. Never retried.
    #[error("client error {status}")]
    Client { status: StatusCode, body: String },

    /// The circuit breaker refused the call without contacting the server.
    #[error("circuit breaker open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// The request could not be built (bad URL, header, or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ApiError::CircuitOpen { .. })
    }

    /// HTTP status, if the failure carried one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } | ApiError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport_error",
            ApiError::Server { .. } => "server_error",
            ApiError::Client { .. } => "client_error",
            ApiError::CircuitOpen { .. } => "circuit_open",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Decode(_) => "decode_error",
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
