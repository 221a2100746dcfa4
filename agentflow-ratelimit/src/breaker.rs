// agentflow-ratelimit/src/breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Per-target closed/open/half-open breaker over a rolling
//              request window.
// Purpose: Stop hammering a failing dependency (role adapter, webhook
//          endpoint) and admit limited probes once its recovery timeout
//          elapses.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! One breaker instance guards one target. `closed` accumulates
//! successes/failures; crossing `failure_threshold` over at least
//! `minimum_requests` observations opens the breaker for
//! `recovery_timeout_s`. Once that elapses, up to `half_open_probe_count`
//! calls are admitted; `success_threshold` consecutive successes close it
//! again, and any half-open failure reopens with a fresh backoff.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use agentflow_core::Timestamp;
use tokio::sync::RwLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// The breaker's externally observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; successes and failures are tallied.
    Closed,
    /// Calls fail fast until `next_attempt_at`.
    Open,
    /// A limited number of probe calls are admitted.
    HalfOpen,
}

/// Parameters governing one breaker's transitions.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Failure fraction, in `[0, 1]`, above which the breaker opens.
    pub failure_threshold: f64,
    /// Minimum requests observed before the failure fraction is evaluated.
    pub minimum_requests: u32,
    /// Seconds the breaker stays open before probing.
    pub recovery_timeout_s: u64,
    /// Calls admitted while half-open before deciding to close or reopen.
    pub half_open_probe_count: u32,
    /// Consecutive half-open successes required to close.
    pub success_threshold: u32,
}

/// Internal rolling tally and transition bookkeeping for one target.
#[derive(Debug, Clone)]
struct TargetState {
    /// Current breaker state for this target.
    state: CircuitState,
    /// Successes observed in the current closed-state window.
    successes: u32,
    /// Failures observed in the current closed-state window.
    failures: u32,
    /// Unix millis at which an open breaker transitions to half-open.
    next_attempt_at_ms: i64,
    /// Probe calls already issued while half-open.
    half_open_probes_issued: u32,
    /// Consecutive successes observed while half-open.
    half_open_consecutive_successes: u32,
}

impl Default for TargetState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            successes: 0,
            failures: 0,
            next_attempt_at_ms: 0,
            half_open_probes_issued: 0,
            half_open_consecutive_successes: 0,
        }
    }
}

/// Whether a call against a target may proceed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call may proceed.
    Allowed,
    /// The call must fail fast; the breaker is open.
    Rejected,
}

// ============================================================================
// SECTION: CircuitBreakerRegistry
// ============================================================================

/// A registry of per-target circuit breakers sharing one `BreakerConfig`.
pub struct CircuitBreakerRegistry {
    /// Transition parameters shared by every target this registry tracks.
    config: BreakerConfig,
    /// Per-target breaker state, created lazily on first observation.
    targets: RwLock<HashMap<String, TargetState>>,
}

impl CircuitBreakerRegistry {
    /// Creates a registry with the given configuration.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            targets: RwLock::new(HashMap::new()),
        })
    }

    /// Checks whether a call against `target` may proceed, transitioning
    /// `open` to `half_open` when `next_attempt_at` has passed.
    pub async fn check(&self, target: &str, now: Timestamp) -> Admission {
        let mut targets = self.targets.write().await;
        let state = targets.entry(target.to_string()).or_default();
        match state.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => {
                if now.as_millis() >= state.next_attempt_at_ms {
                    state.state = CircuitState::HalfOpen;
                    state.half_open_probes_issued = 0;
                    state.half_open_consecutive_successes = 0;
                    Admission::Allowed
                } else {
                    Admission::Rejected
                }
            }
            CircuitState::HalfOpen => {
                if state.half_open_probes_issued < self.config.half_open_probe_count {
                    state.half_open_probes_issued += 1;
                    Admission::Allowed
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    /// Records the outcome of a call previously admitted by [`Self::check`].
    pub async fn record(&self, target: &str, success: bool, now: Timestamp) {
        let mut targets = self.targets.write().await;
        let state = targets.entry(target.to_string()).or_default();
        match state.state {
            CircuitState::Closed => {
                if success {
                    state.successes += 1;
                } else {
                    state.failures += 1;
                }
                let total = state.successes + state.failures;
                if total >= self.config.minimum_requests {
                    #[allow(clippy::cast_precision_loss, reason = "request counts stay far below f64's exact-integer range")]
                    let failure_fraction = f64::from(state.failures) / f64::from(total);
                    if failure_fraction >= self.config.failure_threshold {
                        state.state = CircuitState::Open;
                        #[allow(clippy::cast_possible_wrap, reason = "recovery timeout in seconds fits comfortably in i64 millis")]
                        let recovery_ms = (self.config.recovery_timeout_s * 1000) as i64;
                        state.next_attempt_at_ms = now.as_millis() + recovery_ms;
                        state.successes = 0;
                        state.failures = 0;
                    }
                }
            }
            CircuitState::HalfOpen => {
                if success {
                    state.half_open_consecutive_successes += 1;
                    if state.half_open_consecutive_successes >= self.config.success_threshold {
                        state.state = CircuitState::Closed;
                        state.successes = 0;
                        state.failures = 0;
                    }
                } else {
                    state.state = CircuitState::Open;
                    #[allow(clippy::cast_possible_wrap, reason = "recovery timeout in seconds fits comfortably in i64 millis")]
                    let recovery_ms = (self.config.recovery_timeout_s * 1000) as i64;
                    state.next_attempt_at_ms = now.as_millis() + recovery_ms;
                    state.half_open_consecutive_successes = 0;
                }
            }
            CircuitState::Open => {
                // A call outcome arriving while open (e.g. a stray in-flight
                // probe) does not affect the breaker; `check` is the gate.
            }
        }
    }

    /// Returns the current state of `target`, `closed` if never observed.
    pub async fn state_of(&self, target: &str) -> CircuitState {
        self.targets.read().await.get(target).map_or(CircuitState::Closed, |state| state.state)
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 0.5,
            minimum_requests: 4,
            recovery_timeout_s: 30,
            half_open_probe_count: 2,
            success_threshold: 2,
        }
    }

    #[tokio::test]
    async fn opens_after_failure_fraction_crosses_threshold() {
        let registry = CircuitBreakerRegistry::new(config());
        let now = Timestamp::from_millis(0);
        for success in [true, false, false, false] {
            assert_eq!(registry.check("svc", now).await, Admission::Allowed);
            registry.record("svc", success, now).await;
        }
        assert_eq!(registry.state_of("svc").await, CircuitState::Open);
        assert_eq!(registry.check("svc", now).await, Admission::Rejected);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let registry = CircuitBreakerRegistry::new(config());
        let t0 = Timestamp::from_millis(0);
        for success in [false, false, false, false] {
            registry.check("svc", t0).await;
            registry.record("svc", success, t0).await;
        }
        assert_eq!(registry.state_of("svc").await, CircuitState::Open);

        let after_recovery = Timestamp::from_millis(31_000);
        assert_eq!(registry.check("svc", after_recovery).await, Admission::Allowed);
        registry.record("svc", true, after_recovery).await;
        assert_eq!(registry.check("svc", after_recovery).await, Admission::Allowed);
        registry.record("svc", true, after_recovery).await;
        assert_eq!(registry.state_of("svc").await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_with_fresh_backoff() {
        let registry = CircuitBreakerRegistry::new(config());
        let t0 = Timestamp::from_millis(0);
        for success in [false, false, false, false] {
            registry.check("svc", t0).await;
            registry.record("svc", success, t0).await;
        }
        let after_recovery = Timestamp::from_millis(31_000);
        registry.check("svc", after_recovery).await;
        registry.record("svc", false, after_recovery).await;
        assert_eq!(registry.state_of("svc").await, CircuitState::Open);
        assert_eq!(registry.check("svc", after_recovery).await, Admission::Rejected);
    }
}
