//! Retry logic.
//!
//! # Responsibilities
//! - Classify each attempt (success, retryable failure, fatal failure)
//! - Drive up to `max_retries + 1` attempts of one logical request
//! - Consult the circuit breaker before every attempt and report every
//!   completed attempt back to it
//! - Wait between attempts according to the configured [`Backoff`]
//!
//! # Design Decisions
//! - Transport errors and 5xx are retryable; 4xx is fatal
//! - A breaker rejection ends the logical request immediately
//! - Attempts are strictly sequential; the breaker lock is never held
//!   while waiting or while the attempt is in flight
//! - Dropping the future cancels the request; an attempt cut short this
//!   way settles nothing in the breaker

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;

use crate::config::{FailureAccounting, ResilienceConfig};
use crate::http::error::{ApiError, ApiResult, TransportError};
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::resilience::backoff::{Backoff, ExponentialBackoff};
use crate::resilience::circuit_breaker::CircuitBreaker;

/// How a response status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Retryable,
    Fatal,
}

/// Maps a response status to a [`Classification`].
pub type Classifier = fn(StatusCode) -> Classification;

/// Default policy: 2xx/3xx succeed, 5xx retry, everything else is fatal.
pub fn classify_status(status: StatusCode) -> Classification {
    match status.as_u16() {
        200..=399 => Classification::Success,
        500..=599 => Classification::Retryable,
        _ => Classification::Fatal,
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(ApiResponse),
    RetryableFailure(ApiError),
    FatalFailure(ApiError),
}

fn status_error(response: ApiResponse) -> ApiError {
    let status = response.status;
    let body = response.text();
    if status.is_client_error() {
        ApiError::Client { status, body }
    } else {
        ApiError::Server { status, body }
    }
}

/// Classify the raw result of one transport invocation.
pub fn classify(result: Result<ApiResponse, TransportError>, classifier: Classifier) -> AttemptOutcome {
    match result {
        Err(e) => AttemptOutcome::RetryableFailure(ApiError::Transport(e)),
        Ok(response) => match classifier(response.status) {
            Classification::Success => AttemptOutcome::Success(response),
            Classification::Retryable => AttemptOutcome::RetryableFailure(status_error(response)),
            Classification::Fatal => AttemptOutcome::FatalFailure(status_error(response)),
        },
    }
}

/// Retry orchestrator for one client.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    accounting: FailureAccounting,
    backoff: Arc<dyn Backoff>,
    classifier: Classifier,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            max_retries,
            accounting: FailureAccounting::PerAttempt,
            backoff,
            classifier: classify_status,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.max_retries, Arc::new(ExponentialBackoff::from_config(config)))
            .with_accounting(config.failure_accounting)
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_accounting(mut self, accounting: FailureAccounting) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run one logical request.
    ///
    /// `attempt` is invoked with the 0-based attempt index and must issue
    /// exactly one transport call.
    pub async fn execute<F, Fut>(&self, breaker: &CircuitBreaker, label: &str, mut attempt: F) -> ApiResult<ApiResponse>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<ApiResponse, TransportError>>,
    {
        let mut index = 0u32;
        loop {
            let permit = match breaker.try_acquire() {
                Ok(permit) => permit,
                Err(open) => {
                    tracing::warn!(
                        attempt = index,
                        retry_after = ?open.retry_after,
                        "Circuit breaker open, failing fast"
                    );
                    return Err(ApiError::CircuitOpen { retry_after: open.retry_after });
                }
            };

            metrics::record_attempt(label);
            tracing::debug!(attempt = index, trial = permit.is_trial(), "Issuing attempt");
            let result = attempt(index).await;
            let last = index >= self.max_retries;

            match classify(result, self.classifier) {
                AttemptOutcome::Success(response) => {
                    breaker.record_success(permit);
                    return Ok(response);
                }
                AttemptOutcome::FatalFailure(err) => {
                    breaker.record_failure(permit);
                    tracing::debug!(attempt = index, error = %err, "Fatal failure, not retrying");
                    return Err(err);
                }
                AttemptOutcome::RetryableFailure(err) => {
                    let charge = last
                        || permit.is_trial()
                        || self.accounting == FailureAccounting::PerAttempt;
                    if charge {
                        breaker.record_failure(permit);
                    } else {
                        breaker.release(permit);
                    }

                    if last {
                        tracing::debug!(attempts = index + 1, error = %err, "Retries exhausted");
                        return Err(err);
                    }

                    index += 1;
                    let delay = self.backoff.delay(index);
                    tracing::warn!(attempt = index, delay = ?delay, error = %err, "Retrying request");
                    metrics::record_retry(label);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("accounting", &self.accounting)
            .field("backoff", &self.backoff)
            .finish()
    }
}
