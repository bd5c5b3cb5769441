//! Exponential backoff with jitter.

use std::fmt;
use std::time::Duration;

use rand::Rng;

use crate::config::ResilienceConfig;

/// Calculate the wait before retry `retry` (1-based; 1 is the first retry,
/// not the initial attempt).
///
/// `base * factor^(retry-1)`, perturbed uniformly by up to `jitter` of
/// itself in either direction and floored at zero.
pub fn calculate_backoff(retry: u32, base: Duration, factor: f64, jitter: f64) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
    let delay = base.as_secs_f64() * factor.powi(exponent);
    if !delay.is_finite() || delay <= 0.0 {
        return if delay.is_infinite() { Duration::MAX } else { Duration::ZERO };
    }

    // Sample a unit offset and scale it, so a spread that overflows to
    // infinity never reaches the range sampler.
    let spread = delay * jitter.max(0.0);
    let offset = if spread > 0.0 {
        spread * rand::thread_rng().gen_range(-1.0f64..=1.0)
    } else {
        0.0
    };

    // NaN (infinite spread times a zero sample) floors to zero.
    Duration::try_from_secs_f64((delay + offset).max(0.0)).unwrap_or(Duration::MAX)
}

/// Source of inter-attempt wait durations.
pub trait Backoff: Send + Sync + fmt::Debug {
    /// Wait before retry `retry` (1-based).
    fn delay(&self, retry: u32) -> Duration;
}

/// Exponential backoff with bounded random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, factor: f64, jitter: f64) -> Self {
        Self { base, factor, jitter }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.base_delay(), config.backoff_factor, config.jitter)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base, self.factor, self.jitter)
    }
}

/// Retry immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _retry: u32) -> Duration {
        Duration::ZERO
    }
}
