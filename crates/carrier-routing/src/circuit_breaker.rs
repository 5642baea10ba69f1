//! Per-provider circuit breaker (§4.4).
//!
//! A hand-rolled state machine rather than a wrapper around `failsafe`
//! (the teacher's `src/routing/circuit_breaker.rs` choice): the spec's
//! volume/error-rate gating, bounded half-open probing, and on-demand
//! recovery at selection time need state `failsafe` doesn't expose.
//! Grounded instead in the teacher's atomics-based
//! `crates/llm-edge-routing/src/circuit_breaker.rs`, generalized from a
//! single consecutive-failure counter to the full state machine.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::BreakerCallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub monitoring_period: Duration,
    pub volume_threshold: u32,
    pub error_threshold_percent: f64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(60),
            volume_threshold: 10,
            error_threshold_percent: 50.0,
            half_open_max_calls: 3,
        }
    }
}

struct WindowSample {
    at: DateTime<Utc>,
    success: bool,
}

/// Read-only snapshot of `CircuitBreakerState` (§3), for metrics/tests.
#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_requests: u64,
    pub windowed_successes: u32,
    pub windowed_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub half_open_in_flight: u32,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    total_requests: u64,
    window: VecDeque<WindowSample>,
    last_failure_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
    half_open_in_flight: u32,
    half_open_successes: u32,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            total_requests: 0,
            window: VecDeque::new(),
            last_failure_at: None,
            next_attempt_at: None,
            half_open_in_flight: 0,
            half_open_successes: 0,
        }
    }

    fn prune_window(&mut self, now: DateTime<Utc>, monitoring_period: Duration) {
        let cutoff = now - chrono::Duration::from_std(monitoring_period).unwrap_or_default();
        while matches!(self.window.front(), Some(sample) if sample.at < cutoff) {
            self.window.pop_front();
        }
    }

    fn windowed_counts(&self) -> (u32, u32) {
        let successes = self.window.iter().filter(|s| s.success).count() as u32;
        let failures = self.window.len() as u32 - successes;
        (successes, failures)
    }

    fn snapshot(&self) -> CircuitBreakerSnapshot {
        let (successes, failures) = self.windowed_counts();
        CircuitBreakerSnapshot {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            total_requests: self.total_requests,
            windowed_successes: successes,
            windowed_failures: failures,
            last_failure_at: self.last_failure_at,
            next_attempt_at: self.next_attempt_at,
            half_open_in_flight: self.half_open_in_flight,
        }
    }
}

/// What state the call entered under; determines how the outcome is
/// recorded. Not exposed outside this module.
enum Admission {
    Closed,
    HalfOpen,
}

/// Per-provider breaker. One instance per provider id, owned by the
/// dispatcher subsystem's `ProviderState`, guarded by its own lock —
/// never a global lock across providers (§5).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    notify: watch::Sender<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let (notify, _) = watch::channel(CircuitState::Closed);
        Self {
            config,
            inner: Mutex::new(Inner::new()),
            notify,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Subscribe to state transitions without polling.
    pub fn subscribe(&self) -> watch::Receiver<CircuitState> {
        self.notify.subscribe()
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Selector step 2 (§4.3): if OPEN and `nextAttemptAt` has passed,
    /// flip to HALF_OPEN and report the provider as includable. Never
    /// mutates anything but this one transition.
    pub fn consult_for_selection(&self, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let reached = inner.next_attempt_at.map(|at| now >= at).unwrap_or(false);
                if reached {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 0;
                    inner.half_open_successes = 0;
                    drop(inner);
                    info!("circuit breaker transitioning to half-open");
                    let _ = self.notify.send(CircuitState::HalfOpen);
                }
                reached
            }
        }
    }

    fn try_admit(&self) -> Result<Admission, ()> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.total_requests += 1;
                Ok(Admission::Closed)
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_calls {
                    inner.half_open_in_flight += 1;
                    Ok(Admission::HalfOpen)
                } else {
                    Err(())
                }
            }
            CircuitState::Open => Err(()),
        }
    }

    fn record_success(&self, admission: Admission) {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        inner.prune_window(now, self.config.monitoring_period);
        inner.window.push_back(WindowSample {
            at: now,
            success: true,
        });
        match admission {
            Admission::Closed => {
                inner.consecutive_failures = 0;
            }
            Admission::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_max_calls {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    inner.next_attempt_at = None;
                    drop(inner);
                    info!("circuit breaker closing after half-open recovery");
                    let _ = self.notify.send(CircuitState::Closed);
                }
            }
        }
    }

    fn record_failure(&self, admission: Admission) {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        inner.prune_window(now, self.config.monitoring_period);
        inner.window.push_back(WindowSample {
            at: now,
            success: false,
        });
        inner.last_failure_at = Some(now);

        match admission {
            Admission::Closed => {
                inner.consecutive_failures += 1;
                let (_, windowed_failures) = inner.windowed_counts();
                let windowed_total = inner.window.len() as u32;
                let error_rate = if windowed_total == 0 {
                    0.0
                } else {
                    windowed_failures as f64 / windowed_total as f64 * 100.0
                };
                let volume_met = inner.total_requests >= self.config.volume_threshold as u64;
                let failure_met = inner.consecutive_failures >= self.config.failure_threshold;
                let rate_met = error_rate >= self.config.error_threshold_percent;
                if volume_met && (failure_met || rate_met) {
                    inner.state = CircuitState::Open;
                    inner.next_attempt_at = Some(
                        now + chrono::Duration::from_std(self.config.recovery_timeout)
                            .unwrap_or_default(),
                    );
                    drop(inner);
                    warn!("circuit breaker opening after sustained failures");
                    let _ = self.notify.send(CircuitState::Open);
                }
            }
            Admission::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                inner.state = CircuitState::Open;
                inner.half_open_successes = 0;
                inner.next_attempt_at = Some(
                    now + chrono::Duration::from_std(self.config.recovery_timeout)
                        .unwrap_or_default(),
                );
                drop(inner);
                warn!("circuit breaker reopening after half-open probe failure");
                let _ = self.notify.send(CircuitState::Open);
            }
        }
    }

    /// Execute `f` under the breaker's admission control.
    /// `Err(BreakerCallError::Open)` is the "breaker open" rejection (§7);
    /// the dispatcher treats it as retryable for failover purposes. Only
    /// call this for outcomes that should count against the breaker —
    /// business failures (`status ∈ {failed, rejected}`) never reach it.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerCallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let admission = self.try_admit().map_err(|_| BreakerCallError::Open)?;
        match f().await {
            Ok(value) => {
                self.record_success(admission);
                Ok(value)
            }
            Err(err) => {
                self.record_failure(admission);
                Err(BreakerCallError::Inner(err))
            }
        }
    }

    /// Operator control: force OPEN regardless of counters.
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Open;
        inner.next_attempt_at = Some(
            Utc::now() + chrono::Duration::from_std(self.config.recovery_timeout).unwrap_or_default(),
        );
        drop(inner);
        warn!("circuit breaker forced open");
        let _ = self.notify.send(CircuitState::Open);
    }

    /// Operator control: force CLOSED, clearing all counters.
    pub fn force_close(&self) {
        *self.inner.lock() = Inner::new();
        info!("circuit breaker forced closed");
        let _ = self.notify.send(CircuitState::Closed);
    }

    /// Operator control: reset to a fresh CLOSED state.
    pub fn reset(&self) {
        self.force_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(config: CircuitBreakerConfig) -> CircuitBreaker {
        CircuitBreaker::new(config)
    }

    #[tokio::test]
    async fn stays_closed_below_volume_threshold() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 2,
            volume_threshold: 10,
            ..Default::default()
        });
        for _ in 0..5 {
            let _ = cb.execute(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.snapshot().total_requests < 10);
    }

    #[tokio::test]
    async fn opens_after_volume_and_failure_threshold_met() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 5,
            volume_threshold: 10,
            ..Default::default()
        });
        for _ in 0..10 {
            let _ = cb.execute(|| async { Err::<(), _>("boom") }).await;
        }
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert!(snap.next_attempt_at.is_some());
    }

    #[tokio::test]
    async fn half_open_bounds_concurrent_probes() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            volume_threshold: 1,
            half_open_max_calls: 3,
            recovery_timeout: Duration::from_millis(0),
            ..Default::default()
        });
        let _ = cb.execute(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.consult_for_selection(Utc::now()));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        for _ in 0..3 {
            assert!(cb.try_admit().is_ok());
        }
        assert!(cb.try_admit().is_err());
    }

    #[tokio::test]
    async fn half_open_closes_after_enough_successes() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            volume_threshold: 1,
            half_open_max_calls: 2,
            recovery_timeout: Duration::from_millis(0),
            ..Default::default()
        });
        let _ = cb.execute(|| async { Err::<(), _>("boom") }).await;
        cb.consult_for_selection(Utc::now());
        for _ in 0..2 {
            cb.execute(|| async { Ok::<_, &str>(()) }).await.unwrap();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            volume_threshold: 1,
            recovery_timeout: Duration::from_millis(0),
            ..Default::default()
        });
        let _ = cb.execute(|| async { Err::<(), _>("boom") }).await;
        cb.consult_for_selection(Utc::now());
        let _ = cb.execute(|| async { Err::<(), _>("still broken") }).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn force_open_and_reset() {
        let cb = breaker(CircuitBreakerConfig::default());
        cb.force_open();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
