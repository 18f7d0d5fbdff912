//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, outcomes recorded in a rolling window
//! - Open: downstream assumed down, calls fail fast without a network call
//! - Half-Open: a limited number of trial calls test whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: window full and failure ratio > configured ratio
//! Open → Half-Open: after the configured delay
//! Half-Open → Closed: success_threshold trial calls succeed
//! Half-Open → Open: any trial call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per client instance, never global state
//! - Counters behind a mutex; the critical sections never await
//! - Permits are RAII guards so a cancelled call frees its trial slot
//! - Permits carry the state generation they were issued in; outcomes from an
//!   earlier generation are ignored

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::clock::{Clock, SystemClock};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric value exported as a gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::Open => 1.0,
            Self::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is open")]
pub struct BreakerOpen;

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Most recent outcomes while closed; `true` marks a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trials_in_flight: u32,
    trial_successes: u32,
    /// Bumped on every transition.
    generation: u64,
}

/// Rolling-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let window = VecDeque::with_capacity(config.request_volume_threshold);
        Self {
            config,
            clock,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window,
                opened_at: None,
                trials_in_flight: 0,
                trial_successes: 0,
                generation: 0,
            }),
        }
    }

    /// Current state, after applying any elapsed open delay.
    pub fn state(&self) -> CircuitState {
        let mut state = self.lock();
        self.refresh(&mut state);
        state.state
    }

    /// Ask to perform a call. The permit must be resolved with the call's outcome.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, BreakerOpen> {
        let mut state = self.lock();
        self.refresh(&mut state);
        match state.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false, state.generation)),
            CircuitState::Open => Err(BreakerOpen),
            CircuitState::HalfOpen => {
                if state.trials_in_flight < self.config.half_open_max_calls {
                    state.trials_in_flight += 1;
                    Ok(CallPermit::new(self, true, state.generation))
                } else {
                    Err(BreakerOpen)
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, state: &mut BreakerState) {
        if state.state != CircuitState::Open {
            return;
        }
        let Some(opened_at) = state.opened_at else {
            return;
        };
        if self.clock.now().saturating_duration_since(opened_at) >= self.config.delay() {
            state.trials_in_flight = 0;
            state.trial_successes = 0;
            self.transition(state, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, state: &mut BreakerState, to: CircuitState) {
        let from = state.state;
        state.state = to;
        state.generation = state.generation.wrapping_add(1);
        match to {
            CircuitState::Open => {
                state.opened_at = Some(self.clock.now());
                state.window.clear();
                state.trials_in_flight = 0;
                tracing::warn!(%from, "Circuit breaker opened");
            }
            CircuitState::HalfOpen => {
                tracing::info!(%from, "Circuit breaker half-open, allowing trial calls");
            }
            CircuitState::Closed => {
                state.opened_at = None;
                state.window.clear();
                tracing::info!(%from, "Circuit breaker closed, downstream recovered");
            }
        }
        metrics::record_circuit_state(to);
    }

    fn record(&self, trial: bool, generation: u64, failed: bool) {
        let mut state = self.lock();
        self.refresh(&mut state);
        if state.generation != generation {
            tracing::debug!(failed, "Ignoring outcome of a call admitted before the last transition");
            return;
        }

        match (state.state, trial) {
            (CircuitState::Closed, false) => {
                state.window.push_back(failed);
                while state.window.len() > self.config.request_volume_threshold {
                    state.window.pop_front();
                }
                if state.window.len() == self.config.request_volume_threshold {
                    let failures = state.window.iter().filter(|f| **f).count();
                    let ratio = failures as f64 / state.window.len() as f64;
                    if ratio > self.config.failure_ratio {
                        tracing::debug!(failures, ratio, "Failure ratio exceeded");
                        self.transition(&mut state, CircuitState::Open);
                    }
                }
            }
            (CircuitState::HalfOpen, true) => {
                state.trials_in_flight = state.trials_in_flight.saturating_sub(1);
                if failed {
                    self.transition(&mut state, CircuitState::Open);
                } else {
                    state.trial_successes += 1;
                    if state.trial_successes >= self.config.success_threshold {
                        self.transition(&mut state, CircuitState::Closed);
                    }
                }
            }
            _ => {}
        }
    }

    fn abandon(&self, trial: bool, generation: u64) {
        if !trial {
            return;
        }
        let mut state = self.lock();
        if state.state == CircuitState::HalfOpen && state.generation == generation {
            state.trials_in_flight = state.trials_in_flight.saturating_sub(1);
        }
    }
}

/// Admission to perform one call through the breaker.
///
/// Dropping it unresolved (e.g. the call was cancelled) records nothing.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    generation: u64,
    resolved: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool, generation: u64) -> Self {
        Self {
            breaker,
            trial,
            generation,
            resolved: false,
        }
    }

    pub fn record_success(mut self) {
        self.resolved = true;
        self.breaker.record(self.trial, self.generation, false);
    }

    pub fn record_failure(mut self) {
        self.resolved = true;
        self.breaker.record(self.trial, self.generation, true);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.abandon(self.trial, self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use std::time::Duration;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let breaker = CircuitBreaker::with_clock(CircuitBreakerConfig::default(), clock.clone());
        (breaker, clock)
    }

    fn outcome(breaker: &CircuitBreaker, failed: bool) {
        let permit = breaker.try_acquire().expect("breaker should admit call");
        if failed {
            permit.record_failure();
        } else {
            permit.record_success();
        }
    }

    #[test]
    fn stays_closed_below_volume_threshold() {
        let (breaker, _) = breaker();
        for _ in 0..7 {
            outcome(&breaker, true);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn opens_when_ratio_exceeded_over_full_window() {
        let (breaker, _) = breaker();
        for failed in [false, false, false, true, true, true, true, true] {
            outcome(&breaker, failed);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.try_acquire().unwrap_err(), BreakerOpen);
    }

    #[test]
    fn exactly_half_failures_does_not_open() {
        let (breaker, _) = breaker();
        for failed in [true, false, true, false, true, false, true, false] {
            outcome(&breaker, failed);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn window_rolls_old_outcomes_out() {
        let (breaker, _) = breaker();
        for _ in 0..4 {
            outcome(&breaker, true);
        }
        for _ in 0..8 {
            outcome(&breaker, false);
        }
        // Window now holds eight successes; four more failures are still a minority.
        for _ in 0..4 {
            outcome(&breaker, true);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        outcome(&breaker, true);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_after_delay_then_closes_on_success() {
        let (breaker, clock) = breaker();
        for _ in 0..8 {
            outcome(&breaker, true);
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_millis(4_999));
        assert_eq!(breaker.state(), CircuitState::Open);
        clock.advance(Duration::from_millis(1));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let trial = breaker.try_acquire().unwrap();
        assert_eq!(breaker.try_acquire().unwrap_err(), BreakerOpen);
        trial.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let (breaker, clock) = breaker();
        for _ in 0..8 {
            outcome(&breaker, true);
        }
        clock.advance(Duration::from_secs(5));
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(4));
        assert_eq!(breaker.state(), CircuitState::Open);
        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn dropped_trial_permit_frees_slot() {
        let (breaker, clock) = breaker();
        for _ in 0..8 {
            outcome(&breaker, true);
        }
        clock.advance(Duration::from_secs(5));
        {
            let _trial = breaker.try_acquire().unwrap();
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn trial_from_earlier_half_open_period_is_ignored() {
        let clock = Arc::new(ManualClock::new());
        let config = CircuitBreakerConfig {
            half_open_max_calls: 2,
            ..CircuitBreakerConfig::default()
        };
        let breaker = CircuitBreaker::with_clock(config, clock.clone());
        for _ in 0..8 {
            outcome(&breaker, true);
        }
        clock.advance(Duration::from_secs(5));

        let slow_trial = breaker.try_acquire().unwrap();
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(5));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        slow_trial.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Both trial slots of the new period are still available.
        let a = breaker.try_acquire().unwrap();
        let b = breaker.try_acquire().unwrap();
        assert_eq!(breaker.try_acquire().unwrap_err(), BreakerOpen);
        a.record_success();
        drop(b);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn closed_outcome_from_before_trip_is_ignored() {
        let (breaker, clock) = breaker();
        let late = breaker.try_acquire().unwrap();
        for _ in 0..8 {
            outcome(&breaker, true);
        }
        clock.advance(Duration::from_secs(5));
        breaker.try_acquire().unwrap().record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);

        late.record_failure();
        for _ in 0..3 {
            outcome(&breaker, false);
        }
        for _ in 0..4 {
            outcome(&breaker, true);
        }
        // Seven outcomes in the new window; the stale failure did not fill it.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let (a, _) = breaker();
        let (b, _) = breaker();
        for _ in 0..8 {
            outcome(&a, true);
        }
        assert_eq!(a.state(), CircuitState::Open);
        assert_eq!(b.state(), CircuitState::Closed);
    }
}
