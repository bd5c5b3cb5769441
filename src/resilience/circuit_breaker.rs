//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: a single trial request probes recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold
//! Open → Half-Open: first acquire after the reset timeout (claims the trial)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (reset timer restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per client instance, shared by every request it issues
//! - All transitions happen under one mutex; the lock is never held across
//!   an await point
//! - Admission hands out a [`Permit`]; outcomes are recorded by consuming it,
//!   so a permit can be settled at most once
//! - A permit dropped without being settled (cancelled attempt) leaves the
//!   counters untouched and frees the trial slot if it held it
//! - Outcomes from permits issued before the latest trip are ignored

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::ResilienceConfig;
use crate::observability::metrics;

/// Externally visible breaker status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitStatus::Closed => "closed",
            CircuitStatus::Open => "open",
            CircuitStatus::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

/// Read-only view of the breaker for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResilienceState {
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    /// Seconds until an open breaker admits a trial; zero otherwise.
    pub seconds_until_reset: f64,
    pub circuit_open: bool,
}

/// Admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen {
    /// Time until the breaker will admit a trial call.
    pub retry_after: Duration,
}

#[derive(Debug)]
struct BreakerState {
    status: CircuitStatus,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    /// Incremented on every transition into Open.
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    threshold: u32,
    reset: Duration,
    state: Mutex<BreakerState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Circuit breaker shared by all requests of one client.
///
/// Cloning yields another handle to the same breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// A `threshold` of zero is treated as one.
    pub fn new(threshold: u32, reset: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                threshold: threshold.max(1),
                reset,
                state: Mutex::new(BreakerState {
                    status: CircuitStatus::Closed,
                    consecutive_failures: 0,
                    opened_at: None,
                    trial_in_flight: false,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.circuit_breaker_threshold, config.circuit_breaker_reset())
    }

    pub fn threshold(&self) -> u32 {
        self.shared.threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.shared.reset
    }

    /// Decide whether the caller may issue one attempt.
    ///
    /// When the reset timeout of an open breaker has elapsed, the first
    /// caller moves it to half-open and receives the trial permit.
    pub fn try_acquire(&self) -> Result<Permit, CircuitOpen> {
        let mut state = self.shared.lock();

        match state.status {
            CircuitStatus::Closed => Ok(self.permit(state.generation, false)),
            CircuitStatus::Open => {
                let remaining = self.remaining(&state);
                if remaining.is_zero() {
                    state.status = CircuitStatus::HalfOpen;
                    state.trial_in_flight = true;
                    metrics::record_circuit_state(CircuitStatus::HalfOpen);
                    tracing::info!("Circuit breaker half-open, admitting trial request");
                    Ok(self.permit(state.generation, true))
                } else {
                    metrics::record_circuit_rejection();
                    Err(CircuitOpen { retry_after: remaining })
                }
            }
            CircuitStatus::HalfOpen => {
                if state.trial_in_flight {
                    metrics::record_circuit_rejection();
                    Err(CircuitOpen { retry_after: Duration::ZERO })
                } else {
                    // A previous trial was cancelled; this caller becomes the new trial.
                    state.trial_in_flight = true;
                    Ok(self.permit(state.generation, true))
                }
            }
        }
    }

    /// Record a completed, successful attempt.
    pub fn record_success(&self, mut permit: Permit) {
        permit.settled = true;
        let mut state = self.shared.lock();
        if permit.generation != state.generation {
            tracing::trace!("Ignoring success from a permit issued before the last trip");
            return;
        }

        match state.status {
            CircuitStatus::Closed => state.consecutive_failures = 0,
            CircuitStatus::HalfOpen if permit.trial => {
                state.status = CircuitStatus::Closed;
                state.consecutive_failures = 0;
                state.opened_at = None;
                state.trial_in_flight = false;
                metrics::record_circuit_state(CircuitStatus::Closed);
                tracing::info!("Circuit breaker closed after successful trial");
            }
            CircuitStatus::HalfOpen | CircuitStatus::Open => {}
        }
    }

    /// Record a completed, failed attempt.
    pub fn record_failure(&self, mut permit: Permit) {
        permit.settled = true;
        let mut state = self.shared.lock();
        if permit.generation != state.generation {
            tracing::trace!("Ignoring failure from a permit issued before the last trip");
            return;
        }

        match state.status {
            CircuitStatus::Closed => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                if state.consecutive_failures >= self.shared.threshold {
                    self.trip(&mut state);
                    tracing::warn!(
                        consecutive_failures = state.consecutive_failures,
                        reset_secs = self.shared.reset.as_secs_f64(),
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitStatus::HalfOpen if permit.trial => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                self.trip(&mut state);
                tracing::warn!("Circuit breaker trial failed, reopening");
            }
            CircuitStatus::HalfOpen | CircuitStatus::Open => {}
        }
    }

    /// Release a permit without recording an outcome.
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    /// Current status, failure streak and time until reset.
    pub fn snapshot(&self) -> ResilienceState {
        let state = self.shared.lock();
        let seconds_until_reset = match state.status {
            CircuitStatus::Open => self.remaining(&state).as_secs_f64(),
            _ => 0.0,
        };
        ResilienceState {
            status: state.status,
            consecutive_failures: state.consecutive_failures,
            seconds_until_reset,
            circuit_open: state.status != CircuitStatus::Closed,
        }
    }

    fn permit(&self, generation: u64, trial: bool) -> Permit {
        Permit {
            shared: Arc::clone(&self.shared),
            generation,
            trial,
            settled: false,
        }
    }

    fn trip(&self, state: &mut BreakerState) {
        state.status = CircuitStatus::Open;
        state.opened_at = Some(Instant::now());
        state.trial_in_flight = false;
        state.generation += 1;
        metrics::record_circuit_state(CircuitStatus::Open);
    }

    fn remaining(&self, state: &BreakerState) -> Duration {
        match state.opened_at {
            Some(opened_at) => self.shared.reset.saturating_sub(opened_at.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Admission ticket for a single attempt.
///
/// Settle it with [`CircuitBreaker::record_success`] or
/// [`CircuitBreaker::record_failure`]. Dropping it unsettled counts as
/// neither.
#[must_use = "a permit should be settled with record_success or record_failure"]
pub struct Permit {
    shared: Arc<Shared>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl Permit {
    /// Whether this permit is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("generation", &self.generation)
            .field("trial", &self.trial)
            .field("settled", &self.settled)
            .finish()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.settled || !self.trial {
            return;
        }
        let mut state = self.shared.lock();
        if state.generation == self.generation && state.status == CircuitStatus::HalfOpen {
            state.trial_in_flight = false;
            tracing::debug!("Trial request abandoned, trial slot released");
        }
    }
}
