//! Circuit Breaker Pattern Implementation
//!
//! The breaker keeps a sliding window of the most recent call outcomes and
//! opens once the failure ratio over a full window reaches the configured
//! percentile. It never calls the guarded dependency itself: callers ask
//! [`CircuitBreaker::allow`] before the call and report the outcome with
//! [`CircuitBreaker::record_result`] afterwards, handing back the
//! [`CallPermit`] they were given.
//!
//! Every state transition starts a new generation. A permit only counts
//! toward the generation that issued it, so a slow call admitted while Closed
//! cannot free the HalfOpen trial slot or count as recovery progress.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐
//! │ Closed  │ ◄───────────────────────┐
//! │ (Normal)│                         │
//! └────┬────┘                         │
//!      │ failure ratio >= percentile  │ recovery_requests
//!      │ over a full window           │ consecutive successes
//!      ▼                              │
//! ┌─────────┐    timeout    ┌─────────┴─┐
//! │  Open   │───────────────► HalfOpen  │
//! │(Failing)│                │ (Testing) │
//! └─────────┘◄───────────────└───────────┘
//!                any failure
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use note_service::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! let cb = CircuitBreaker::with_config(
//!     "auth-service".to_string(),
//!     CircuitBreakerConfig {
//!         record_length: 100,
//!         timeout: Duration::from_millis(5000),
//!         percentile: 0.3,
//!         recovery_requests: 10,
//!     },
//! );
//!
//! if let Some(permit) = cb.allow() {
//!     let succeeded = true; // outcome of the guarded call
//!     cb.record_result(permit, succeeded);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, allowing all requests through
    Closed,
    /// Failing state, rejecting all requests until timeout expires
    Open,
    /// Testing state, admitting one trial request at a time
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Admission handed out by [`CircuitBreaker::allow`]
///
/// Carries the generation it was issued in. Results reported with a permit
/// from an earlier generation are counted in the stats but change nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "report the call outcome with CircuitBreaker::record_result"]
pub struct CallPermit {
    generation: u64,
}

impl CallPermit {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Circuit breaker configuration, immutable once the breaker is built
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Capacity of the outcome window
    pub record_length: usize,
    /// Minimum dwell time in the open state before a trial call
    pub timeout: Duration,
    /// Failure ratio over a full window at which the breaker opens
    pub percentile: f64,
    /// Consecutive trial successes required to close again
    pub recovery_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&config::CircuitBreakerConfig::default())
    }
}

impl From<&config::CircuitBreakerConfig> for CircuitBreakerConfig {
    fn from(config: &config::CircuitBreakerConfig) -> Self {
        Self {
            record_length: config.record_length.max(1),
            timeout: config.timeout(),
            percentile: config.percentile,
            recovery_requests: config.recovery_requests.max(1),
        }
    }
}

/// Lifetime counters, readable without taking the state lock
#[derive(Debug, Default)]
struct CircuitBreakerStats {
    total_results: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

/// Everything a transition decision reads or writes, guarded by one lock.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Most recent outcomes, oldest first. `true` is a success.
    outcomes: VecDeque<bool>,
    failures: usize,
    opened_at: Option<Instant>,
    recovery_successes: u32,
    trial_in_flight: bool,
    /// Bumped on every state transition
    generation: u64,
}

impl BreakerState {
    fn new(capacity: usize) -> Self {
        Self {
            state: CircuitState::Closed,
            outcomes: VecDeque::with_capacity(capacity),
            failures: 0,
            opened_at: None,
            recovery_successes: 0,
            trial_in_flight: false,
            generation: 0,
        }
    }

    fn permit(&self) -> CallPermit {
        CallPermit {
            generation: self.generation,
        }
    }

    fn push(&mut self, success: bool, capacity: usize) {
        if self.outcomes.len() == capacity
            && let Some(oldest) = self.outcomes.pop_front()
            && !oldest
        {
            self.failures -= 1;
        }
        self.outcomes.push_back(success);
        if !success {
            self.failures += 1;
        }
    }

    fn failure_ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.failures as f64 / self.outcomes.len() as f64
    }

    fn open(&mut self) {
        self.generation += 1;
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.recovery_successes = 0;
        self.trial_in_flight = false;
    }

    fn half_open(&mut self) {
        self.generation += 1;
        self.state = CircuitState::HalfOpen;
        self.recovery_successes = 0;
        self.trial_in_flight = true;
    }

    fn close(&mut self) {
        self.generation += 1;
        self.state = CircuitState::Closed;
        self.outcomes.clear();
        self.failures = 0;
        self.opened_at = None;
        self.recovery_successes = 0;
        self.trial_in_flight = false;
    }
}

/// Sliding-window circuit breaker
///
/// One instance guards one downstream dependency and is shared by every
/// request handler, so clones share the same state.
///
/// # Thread Safety
///
/// Every state read and transition happens under a single mutex, so
/// concurrent `allow`/`record_result` pairs always observe a consistent
/// state machine. The lock is never held across I/O.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    inner: Arc<Mutex<BreakerState>>,
    stats: Arc<CircuitBreakerStats>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration
    pub fn new(name: String) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration
    pub fn with_config(name: String, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(BreakerState::new(config.record_length))),
            stats: Arc::new(CircuitBreakerStats::default()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The state is plain data, a panic elsewhere cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Get the circuit breaker name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Total number of outcomes reported through `record_result`
    pub fn total_results(&self) -> u64 {
        self.stats.total_results.load(Ordering::Relaxed)
    }

    /// Total number of failed outcomes reported through `record_result`
    pub fn total_failures(&self) -> u64 {
        self.stats.total_failures.load(Ordering::Relaxed)
    }

    /// Total number of calls refused by `allow`
    pub fn total_rejections(&self) -> u64 {
        self.stats.total_rejections.load(Ordering::Relaxed)
    }

    /// Failure ratio over the current window (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        self.lock().failure_ratio()
    }

    /// Number of outcomes currently held in the window
    pub fn window_len(&self) -> usize {
        self.lock().outcomes.len()
    }

    /// Decide whether the caller may invoke the guarded dependency.
    ///
    /// Returns a permit to hand back to [`record_result`](Self::record_result)
    /// once the call finishes, or `None` when the call must not be made.
    ///
    /// - **Closed**: always allowed.
    /// - **Open**: refused until `timeout` has elapsed since the breaker
    ///   opened. The first call after that becomes the trial and moves the
    ///   breaker to HalfOpen.
    /// - **HalfOpen**: one trial at a time. A new trial is admitted only
    ///   once the previous one has reported its outcome.
    pub fn allow(&self) -> Option<CallPermit> {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Some(inner.permit()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed())
                    .unwrap_or(self.config.timeout);

                if elapsed >= self.config.timeout {
                    inner.half_open();
                    tracing::info!(
                        circuit_breaker = %self.name,
                        state = "Open -> HalfOpen",
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Circuit breaker admitting trial call"
                    );
                    Some(inner.permit())
                } else {
                    drop(inner);
                    self.reject("open");
                    None
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    drop(inner);
                    self.reject("trial in flight");
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(inner.permit())
                }
            }
        }
    }

    fn reject(&self, reason: &'static str) {
        self.stats.total_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            circuit_breaker = %self.name,
            reason,
            "Circuit breaker rejected call"
        );
    }

    /// Report the outcome of a call that `allow` admitted.
    ///
    /// # State Transitions
    ///
    /// - **Closed → Open**: the window is full and failures / window length
    ///   is at least `percentile`
    /// - **HalfOpen → Closed**: `recovery_requests` consecutive successes,
    ///   the window starts empty again
    /// - **HalfOpen → Open**: any failure, recovery progress is discarded
    ///
    /// Results carrying a permit from an earlier generation come from calls
    /// admitted before the last transition and are ignored. That covers every
    /// result arriving while Open.
    pub fn record_result(&self, permit: CallPermit, success: bool) {
        self.stats.total_results.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.stats.total_failures.fetch_add(1, Ordering::Relaxed);
        }

        let mut inner = self.lock();

        if permit.generation != inner.generation {
            tracing::debug!(
                circuit_breaker = %self.name,
                state = %inner.state,
                success,
                permit_generation = permit.generation,
                generation = inner.generation,
                "Ignoring result from an earlier breaker generation"
            );
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.push(success, self.config.record_length);

                let ratio = inner.failure_ratio();
                if inner.outcomes.len() == self.config.record_length
                    && ratio >= self.config.percentile
                {
                    inner.open();
                    tracing::warn!(
                        circuit_breaker = %self.name,
                        state = "Closed -> Open",
                        failure_ratio = ratio,
                        percentile = self.config.percentile,
                        window = self.config.record_length,
                        "Circuit breaker opened due to failure ratio"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.trial_in_flight = false;

                if success {
                    inner.recovery_successes += 1;
                    if inner.recovery_successes >= self.config.recovery_requests {
                        let recovered = inner.recovery_successes;
                        inner.close();
                        tracing::info!(
                            circuit_breaker = %self.name,
                            state = "HalfOpen -> Closed",
                            recovery_successes = recovered,
                            "Circuit breaker closed after successful recovery"
                        );
                    }
                } else {
                    let progress = inner.recovery_successes;
                    inner.open();
                    tracing::warn!(
                        circuit_breaker = %self.name,
                        state = "HalfOpen -> Open",
                        discarded_recovery_successes = progress,
                        "Circuit breaker re-opened after failure in HalfOpen state"
                    );
                }
            }
            // Open never issues permits, so its generation has no results
            CircuitState::Open => {}
        }
    }

    /// Manually reset the circuit breaker to Closed state with an empty window
    ///
    /// This is useful for testing or administrative purposes.
    pub fn reset(&self) {
        self.lock().close();
        tracing::info!(
            circuit_breaker = %self.name,
            "Circuit breaker manually reset to Closed"
        );
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("window_len", &inner.outcomes.len())
            .field("window_failures", &inner.failures)
            .field("recovery_successes", &inner.recovery_successes)
            .field("generation", &inner.generation)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn breaker(record_length: usize, timeout_ms: u64, percentile: f64, recovery: u32) -> CircuitBreaker {
        CircuitBreaker::with_config(
            "test".to_string(),
            CircuitBreakerConfig {
                record_length,
                timeout: Duration::from_millis(timeout_ms),
                percentile,
                recovery_requests: recovery,
            },
        )
    }

    fn call(cb: &CircuitBreaker, success: bool) {
        let permit = cb.allow().expect("call should be admitted");
        cb.record_result(permit, success);
    }

    fn feed(cb: &CircuitBreaker, successes: usize, failures: usize) {
        for _ in 0..successes {
            call(cb, true);
        }
        for _ in 0..failures {
            call(cb, false);
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_closed() {
        let cb = CircuitBreaker::new("test".to_string());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow().is_some());
        assert_eq!(cb.window_len(), 0);
    }

    #[tokio::test]
    async fn test_does_not_open_before_window_is_full() {
        let cb = breaker(10, 1000, 0.3, 2);

        // 9 failures, window not full yet
        feed(&cb, 0, 9);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow().is_some());

        call(&cb, false);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_stays_closed_below_percentile() {
        let cb = breaker(10, 1000, 0.3, 2);

        feed(&cb, 8, 2);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_rate(), 0.2);
    }

    #[tokio::test]
    async fn test_window_ages_out_oldest_outcomes() {
        let cb = breaker(4, 1000, 0.75, 2);

        // [F, F, S, S] -> 0.5
        feed(&cb, 0, 2);
        feed(&cb, 2, 0);
        assert_eq!(cb.failure_rate(), 0.5);

        // Two more successes push both failures out
        feed(&cb, 2, 0);
        assert_eq!(cb.window_len(), 4);
        assert_eq!(cb.failure_rate(), 0.0);

        // [S, S, F, F] -> 0.5, then [S, F, F, F] -> 0.75 opens
        feed(&cb, 0, 2);
        assert_eq!(cb.state(), CircuitState::Closed);
        call(&cb, false);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_until_timeout() {
        let cb = breaker(4, 1000, 0.5, 1);
        feed(&cb, 2, 2);
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.allow().is_none());
        advance(Duration::from_millis(999)).await;
        assert!(cb.allow().is_none());
        assert_eq!(cb.total_rejections(), 2);

        advance(Duration::from_millis(1)).await;
        assert!(cb.allow().is_some());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_trial_after_timeout() {
        let cb = breaker(2, 100, 0.5, 3);
        feed(&cb, 0, 2);

        advance(Duration::from_millis(100)).await;

        let trial = cb.allow().unwrap();
        assert!(cb.allow().is_none());
        assert!(cb.allow().is_none());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // The trial reports back, the next one may go
        cb.record_result(trial, true);
        assert!(cb.allow().is_some());
        assert!(cb.allow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_halfopen_to_open_on_failure() {
        let cb = breaker(2, 100, 0.5, 3);
        feed(&cb, 0, 2);
        advance(Duration::from_millis(100)).await;

        call(&cb, true);
        call(&cb, false);

        assert_eq!(cb.state(), CircuitState::Open);
        // Fresh opened_at: the full timeout applies again
        advance(Duration::from_millis(99)).await;
        assert!(cb.allow().is_none());
        advance(Duration::from_millis(1)).await;
        let trial = cb.allow().unwrap();

        // Recovery progress was discarded: three more successes are needed
        cb.record_result(trial, true);
        call(&cb, true);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        call(&cb, true);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_scenario_resets_window() {
        let cb = breaker(100, 5000, 0.3, 10);

        feed(&cb, 70, 30);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.allow().is_none());

        advance(Duration::from_millis(5000)).await;
        feed(&cb, 1, 0);
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        feed(&cb, 9, 0);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.window_len(), 0);
        assert_eq!(cb.failure_rate(), 0.0);
        assert!(cb.allow().is_some());
    }

    #[tokio::test]
    async fn test_late_results_ignored_while_open() {
        let cb = breaker(2, 60_000, 0.5, 1);
        let slow_success = cb.allow().unwrap();
        let slow_failure = cb.allow().unwrap();

        feed(&cb, 0, 2);
        assert_eq!(cb.state(), CircuitState::Open);

        cb.record_result(slow_success, true);
        cb.record_result(slow_failure, false);

        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.total_results(), 4);
        assert_eq!(cb.total_failures(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_from_closed_call_does_not_free_trial_slot() {
        let cb = breaker(2, 100, 0.5, 2);

        // Admitted while Closed, finishes long after the trip
        let slow = cb.allow().unwrap();
        feed(&cb, 0, 2);
        assert_eq!(cb.state(), CircuitState::Open);

        advance(Duration::from_millis(100)).await;
        let trial = cb.allow().unwrap();
        assert_ne!(slow.generation(), trial.generation());

        cb.record_result(slow, true);

        // The trial is still in flight, nobody else gets through
        assert!(cb.allow().is_none());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // The stale success was not counted toward recovery
        cb.record_result(trial, true);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        call(&cb, true);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_from_before_recovery_does_not_enter_new_window() {
        let cb = breaker(2, 100, 0.5, 1);

        let slow = cb.allow().unwrap();
        feed(&cb, 0, 2);
        advance(Duration::from_millis(100)).await;
        call(&cb, true);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_result(slow, false);

        assert_eq!(cb.window_len(), 0);
    }

    #[tokio::test]
    async fn test_manual_reset() {
        let cb = breaker(2, 60_000, 0.5, 1);
        feed(&cb, 0, 2);
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.window_len(), 0);
        assert!(cb.allow().is_some());
    }

    #[tokio::test]
    async fn test_config_from_settings() {
        let settings = config::CircuitBreakerConfig {
            record_length: 50,
            timeout_ms: 250,
            percentile: 0.5,
            recovery_requests: 3,
        };
        let config = CircuitBreakerConfig::from(&settings);

        assert_eq!(config.record_length, 50);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.percentile, 0.5);
        assert_eq!(config.recovery_requests, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_results_open_exactly_once() {
        let cb = breaker(100, 60_000, 0.5, 1);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if let Some(permit) = cb.allow() {
                        cb.record_result(permit, false);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.state(), CircuitState::Open);
        // Calls admitted just before the trip still report, but every
        // attempt is accounted for exactly once.
        assert!(cb.total_results() >= 100);
        assert_eq!(cb.total_results() + cb.total_rejections(), 200);
    }
}
