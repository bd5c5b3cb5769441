//! Request description and preparation.
//!
//! # Responsibilities
//! - Describe one logical request (method, endpoint, headers, body)
//! - Join the endpoint onto the client's base URL
//! - Merge default headers with per-call headers
//! - Generate a request ID that is stable across retries
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is encoded once; every attempt reuses the same bytes

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::http::error::{ApiError, ApiResult};

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One caller-level HTTP call, before defaults are applied.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Attach per-call headers; they override the client's defaults.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Encode `data` as the JSON body.
    pub fn json(mut self, data: &Value) -> ApiResult<Self> {
        let bytes = serde_json::to_vec(data).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = Some(bytes);
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(self)
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully resolved request, ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub request_id: Uuid,
}

/// Join `endpoint` onto `base_url` with exactly one `/` between them.
pub fn join_url(base_url: &str, endpoint: &str) -> ApiResult<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| ApiError::InvalidRequest(format!("invalid URL '{}': {}", joined, e)))
}

/// Resolve a descriptor against the base URL and default headers.
pub fn prepare(
    base_url: &str,
    default_headers: &HeaderMap,
    descriptor: RequestDescriptor,
) -> ApiResult<PreparedRequest> {
    let url = join_url(base_url, &descriptor.endpoint)?;
    let request_id = Uuid::new_v4();

    let mut headers = default_headers.clone();
    for (name, value) in descriptor.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }
    let id_value = HeaderValue::from_str(&request_id.to_string())
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    headers.insert(REQUEST_ID_HEADER, id_value);

    Ok(PreparedRequest {
        method: descriptor.method,
        url,
        headers,
        body: descriptor.body,
        request_id,
    })
}

/// Convert string pairs into a header map, rejecting invalid names or values.
pub fn header_map<'a, I>(pairs: I) -> ApiResult<HeaderMap>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
