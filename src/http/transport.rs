//! Transport collaborator.
//!
//! # Responsibilities
//! - Issue exactly one HTTP exchange per call
//! - Report either a response with a status code or a transport error
//!
//! # Design Decisions
//! - The retry and breaker logic never sees the concrete transport; tests
//!   substitute scripted implementations
//! - Non-2xx statuses are responses, not errors; classification happens
//!   in the retry orchestrator

use std::time::Duration;

use async_trait::async_trait;

use crate::http::error::TransportError;
use crate::http::request::PreparedRequest;
use crate::http::response::ApiResponse;

/// Issues one physical HTTP request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError>;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Io(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn issue(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let map_err = |e| transport_error(e, timeout);

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_err)?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
