//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Check the base URL is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the client

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single violated configuration rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("base_url '{0}' is not a valid URL")]
    InvalidBaseUrl(String),

    #[error("base_url scheme '{0}' is not http or https")]
    UnsupportedScheme(String),

    #[error("timeout_secs must be positive, got {0}")]
    NonPositiveTimeout(f64),

    #[error("resilience.backoff_factor must be positive, got {0}")]
    NonPositiveBackoffFactor(f64),

    #[error("resilience.jitter must be non-negative, got {0}")]
    NegativeJitter(f64),

    #[error("resilience.base_delay_secs must be non-negative, got {0}")]
    NegativeBaseDelay(f64),

    #[error("resilience.circuit_breaker_threshold must be at least 1")]
    ZeroThreshold,

    #[error("resilience.circuit_breaker_reset_secs must be positive, got {0}")]
    NonPositiveReset(f64),

    #[error("{field} = {value} does not fit in a duration")]
    DurationOutOfRange { field: &'static str, value: f64 },

    #[error("default header '{0}' is not a valid header")]
    InvalidHeader(String),
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn check_duration(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if value.is_finite() && Duration::try_from_secs_f64(value.max(0.0)).is_err() {
        errors.push(ValidationError::DurationOutOfRange { field, value });
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.base_url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidBaseUrl(config.base_url.clone())),
    }

    if !positive(config.timeout_secs) {
        errors.push(ValidationError::NonPositiveTimeout(config.timeout_secs));
    }
    check_duration(&mut errors, "timeout_secs", config.timeout_secs);

    for (name, value) in &config.default_headers {
        let valid = reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_ok()
            && reqwest::header::HeaderValue::from_str(value).is_ok();
        if !valid {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    let resilience = &config.resilience;
    if !positive(resilience.backoff_factor) {
        errors.push(ValidationError::NonPositiveBackoffFactor(resilience.backoff_factor));
    }
    if !non_negative(resilience.jitter) {
        errors.push(ValidationError::NegativeJitter(resilience.jitter));
    }
    if !non_negative(resilience.base_delay_secs) {
        errors.push(ValidationError::NegativeBaseDelay(resilience.base_delay_secs));
    }
    check_duration(&mut errors, "resilience.base_delay_secs", resilience.base_delay_secs);
    if resilience.circuit_breaker_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if !positive(resilience.circuit_breaker_reset_secs) {
        errors.push(ValidationError::NonPositiveReset(resilience.circuit_breaker_reset_secs));
    }
    check_duration(
        &mut errors,
        "resilience.circuit_breaker_reset_secs",
        resilience.circuit_breaker_reset_secs,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
