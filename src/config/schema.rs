//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a resilient API client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint is joined onto (e.g., "https://api.example.com/v1").
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: f64,

    /// Headers applied to every request before per-call headers.
    pub default_headers: BTreeMap<String, String>,

    /// Retry and circuit breaker settings.
    pub resilience: ResilienceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Create a configuration for `base_url` with every other field defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Per-attempt timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30.0,
            default_headers,
            resilience: ResilienceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// How failed attempts are charged against the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureAccounting {
    /// Every completed attempt is recorded.
    #[default]
    PerAttempt,
    /// Only the terminal outcome of a logical request is recorded.
    /// Trial attempts in half-open state are always recorded.
    PerRequest,
}

/// Retry and circuit breaker configuration.
///
/// Set once at client construction and never mutated afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry, in seconds.
    pub base_delay_secs: f64,

    /// Multiplicative growth of the delay per retry.
    pub backoff_factor: f64,

    /// Fractional randomization bound applied to each delay
    /// (0.1 means +/- 10%).
    pub jitter: f64,

    /// Consecutive failures before the breaker opens.
    pub circuit_breaker_threshold: u32,

    /// Seconds the breaker stays open before admitting a trial call.
    pub circuit_breaker_reset_secs: f64,

    /// Whether the breaker counts attempts or logical requests.
    pub failure_accounting: FailureAccounting,
}

impl ResilienceConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn circuit_breaker_reset(&self) -> Duration {
        Duration::try_from_secs_f64(self.circuit_breaker_reset_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_secs: 1.0,
            backoff_factor: 0.5,
            jitter: 0.1,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 30.0,
            failure_accounting: FailureAccounting::PerAttempt,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.resilience.max_retries, 2);
        assert_eq!(config.resilience.backoff_factor, 0.5);
        assert_eq!(config.resilience.jitter, 0.1);
        assert_eq!(config.resilience.circuit_breaker_threshold, 5);
        assert_eq!(config.resilience.circuit_breaker_reset(), Duration::from_secs(30));
        assert_eq!(config.resilience.failure_accounting, FailureAccounting::PerAttempt);
        assert_eq!(
            config.default_headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let mut config = ClientConfig::default();
        config.timeout_secs = 1e30;
        config.resilience.base_delay_secs = 1e30;
        config.resilience.circuit_breaker_reset_secs = f64::INFINITY;
        assert_eq!(config.timeout(), Duration::MAX);
        assert_eq!(config.resilience.base_delay(), Duration::MAX);
        assert_eq!(config.resilience.circuit_breaker_reset(), Duration::MAX);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            base_url = "https://api.example.com"

            [resilience]
            max_retries = 4
            failure_accounting = "per_request"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.resilience.max_retries, 4);
        assert_eq!(config.resilience.failure_accounting, FailureAccounting::PerRequest);
        assert_eq!(config.resilience.circuit_breaker_threshold, 5);
        assert_eq!(config.timeout_secs, 30.0);
    }
}
