//! Per-provider circuit breaker with the exact Closed/Open/HalfOpen state machine spec §3
//! requires. Hand-rolled rather than built on a generic circuit-breaker crate, in the same
//! style as the pool's `TokenBucket`: a small piece of mutable state behind an async lock,
//! advanced explicitly on each call instead of through a policy trait.

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    failures: u32,
    last_failure: Option<Instant>,
    open_until: Option<Instant>,
    half_open: bool,
    half_open_successes: u32,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            open_until: None,
            half_open: false,
            half_open_successes: 0,
        }
    }
}

/// One circuit breaker per upstream provider (spec §3 Circuit Breaker State).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(BreakerInner::new()),
        }
    }

    /// Current externally-visible state, resolving Open → HalfOpen if `resetTimeoutMs` has
    /// elapsed since the trip.
    pub async fn state(&self) -> BreakerState {
        let mut inner = self.inner.write().await;
        self.maybe_transition_to_half_open(&mut inner);
        if inner.half_open {
            BreakerState::HalfOpen
        } else if inner.open_until.is_some() {
            BreakerState::Open
        } else {
            BreakerState::Closed
        }
    }

    /// Whether a call is permitted right now. HalfOpen permits calls (to probe recovery);
    /// Open does not.
    pub async fn is_call_permitted(&self) -> bool {
        !matches!(self.state().await, BreakerState::Open)
    }

    fn maybe_transition_to_half_open(&self, inner: &mut BreakerInner) {
        if let Some(open_until) = inner.open_until {
            if Instant::now() >= open_until {
                inner.half_open = true;
                inner.half_open_successes = 0;
                inner.open_until = None;
            }
        }
    }

    /// Records a successful call. In HalfOpen, accumulates toward
    /// `halfOpenSuccessThreshold` and closes the breaker once reached.
    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        self.maybe_transition_to_half_open(&mut inner);
        if inner.half_open {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.half_open_success_threshold {
                *inner = BreakerInner::new();
            }
        } else {
            inner.failures = 0;
        }
    }

    /// Records a failed call. Any failure while HalfOpen reopens the breaker immediately;
    /// in Closed, trips to Open once `failureThreshold` is reached.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        self.maybe_transition_to_half_open(&mut inner);
        inner.last_failure = Some(Instant::now());

        if inner.half_open {
            inner.open_until = Some(Instant::now() + self.reset_timeout());
            inner.half_open = false;
            inner.half_open_successes = 0;
            inner.failures = self.config.failure_threshold;
            return;
        }

        inner.failures += 1;
        if inner.failures >= self.config.failure_threshold {
            inner.open_until = Some(Instant::now() + self.reset_timeout());
        }
    }

    fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.config.reset_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout_ms: 50,
            half_open_success_threshold: 2,
        }
    }

    #[tokio::test]
    async fn starts_closed() {
        let breaker = CircuitBreaker::new(fast_config());
        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert!(breaker.is_call_permitted().await);
    }

    #[tokio::test]
    async fn trips_open_after_threshold_failures() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
        assert!(!breaker.is_call_permitted().await);
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state().await, BreakerState::Open);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
        assert!(breaker.is_call_permitted().await);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
        breaker.record_success().await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
        breaker.record_success().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn any_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
        breaker.record_success().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn success_in_closed_resets_failure_count() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }
}
