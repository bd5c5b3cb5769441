//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every transport invocation with a deadline
//! - Convert an elapsed deadline into a retryable transport error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Applied on top of the transport's own timeout so a misbehaving
//!   transport cannot stall a logical request

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::http::error::TransportError;

/// Run `fut`, failing with [`TransportError::Timeout`] once `deadline` elapses.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(deadline)),
    }
}
