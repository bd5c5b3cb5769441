//! Resilient API client.
//!
//! # Responsibilities
//! - One method per HTTP verb, each building a [`RequestDescriptor`]
//! - Apply default headers (including the auth token) to every request
//! - Delegate every logical request to the retry orchestrator, which
//!   consults the shared circuit breaker
//! - Expose the breaker state for diagnostics
//!
//! # Design Decisions
//! - The client is caller-owned; share it with `Arc<ResilientClient>`
//! - Default headers sit behind their own lock, separate from the breaker
//! - Neither lock is held across an await point

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use tracing::Instrument;

use crate::config::{validate_config, ClientConfig, ConfigError, ValidationError};
use crate::http::error::{ApiError, ApiResult};
use crate::http::request::{header_map, prepare, RequestDescriptor};
use crate::http::response::ApiResponse;
use crate::http::transport::{ReqwestTransport, Transport};
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::circuit_breaker::{CircuitBreaker, ResilienceState};
use crate::resilience::retries::{Classifier, RetryPolicy};
use crate::resilience::timeouts::with_deadline;

/// HTTP API client with retries and a circuit breaker.
pub struct ResilientClient {
    base_url: String,
    timeout: Duration,
    default_headers: RwLock<HeaderMap>,
    transport: Arc<dyn Transport>,
    breaker: CircuitBreaker,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Build a client that talks HTTP through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Build a client on top of a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let default_headers = header_map(
            config
                .default_headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
        .map_err(|e| ConfigError::Validation(vec![ValidationError::InvalidHeader(e.to_string())]))?;

        tracing::debug!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            max_retries = config.resilience.max_retries,
            threshold = config.resilience.circuit_breaker_threshold,
            "API client created"
        );

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            default_headers: RwLock::new(default_headers),
            transport,
            breaker: CircuitBreaker::from_config(&config.resilience),
            policy: RetryPolicy::from_config(&config.resilience),
        })
    }

    /// Replace the backoff schedule.
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.policy = self.policy.with_backoff(backoff);
        self
    }

    /// Replace the status classification policy.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.policy = self.policy.with_classifier(classifier);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str, headers: Option<HeaderMap>) -> ApiResult<ApiResponse> {
        self.send(Method::GET, endpoint, None, headers).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        data: Option<&Value>,
        headers: Option<HeaderMap>,
    ) -> ApiResult<ApiResponse> {
        self.send(Method::POST, endpoint, data, headers).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        data: Option<&Value>,
        headers: Option<HeaderMap>,
    ) -> ApiResult<ApiResponse> {
        self.send(Method::PUT, endpoint, data, headers).await
    }

    pub async fn delete(&self, endpoint: &str, headers: Option<HeaderMap>) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, endpoint, None, headers).await
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        data: Option<&Value>,
        headers: Option<HeaderMap>,
    ) -> ApiResult<ApiResponse> {
        let mut descriptor = RequestDescriptor::new(method, endpoint).headers(headers.unwrap_or_default());
        if let Some(data) = data {
            descriptor = descriptor.json(data)?;
        }
        self.request(descriptor).await
    }

    /// Issue one logical request with retries and breaker protection.
    pub async fn request(&self, descriptor: RequestDescriptor) -> ApiResult<ApiResponse> {
        let method = descriptor.method.clone();
        let prepared = {
            let defaults = self.default_headers.read().unwrap_or_else(PoisonError::into_inner);
            prepare(&self.base_url, &defaults, descriptor)
        };
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(method = %method, error = %e, "Request rejected before sending");
                metrics::record_request(method.as_str(), e.kind());
                return Err(e);
            }
        };

        let span = tracing::info_span!(
            "request",
            request_id = %prepared.request_id,
            method = %prepared.method,
            url = %prepared.url
        );

        async {
            tracing::debug!("Making request");

            let timeout = self.timeout;
            let transport = &self.transport;
            let request = &prepared;
            let result = self
                .policy
                .execute(&self.breaker, method.as_str(), move |_| {
                    with_deadline(timeout, transport.issue(request, timeout))
                })
                .await;

            match &result {
                Ok(response) => {
                    tracing::debug!(status = %response.status, "Request completed");
                    metrics::record_request(method.as_str(), "success");
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = e.kind(), "Request failed");
                    metrics::record_request(method.as_str(), e.kind());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Set `Authorization: Bearer <token>` on every subsequent request.
    pub fn set_auth_token(&self, token: &str) -> ApiResult<()> {
        self.set_auth_token_with_type(token, "Bearer")
    }

    /// Set `Authorization: <token_type> <token>` on every subsequent request.
    pub fn set_auth_token_with_type(&self, token: &str, token_type: &str) -> ApiResult<()> {
        let mut value = HeaderValue::from_str(&format!("{} {}", token_type, token))
            .map_err(|e| ApiError::InvalidRequest(format!("authorization header: {}", e)))?;
        value.set_sensitive(true);

        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION, value);
        tracing::info!(token_type, "Authentication token set");
        Ok(())
    }

    /// Remove the `Authorization` default header.
    pub fn clear_auth_token(&self) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);
        tracing::info!("Authentication token cleared");
    }

    /// Copy of the headers currently applied to every request.
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Breaker status for diagnostics. Never changes breaker state.
    pub fn get_resilience_state(&self) -> ResilienceState {
        self.breaker.snapshot()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("breaker", &self.breaker.snapshot())
            .finish()
    }
}
