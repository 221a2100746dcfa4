// agentflow-rcr/src/metrics.rs
// ============================================================================
// Module: Router Metrics
// Description: Rolling routing counters and the derived health tier.
// Purpose: Give operators a cheap, always-on view of router behavior without
//          a metrics-export format (Non-goal) baked into this crate.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Counters accumulate for the life of the process; `router_metrics.json`
//! (written by the pipeline crate) is just a snapshot of this state. Health
//! tiers use the stepwise accuracy/latency/utilization thresholds from the
//! routing contract.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::RwLock;

/// Health classification derived from rolling accuracy, latency, and
/// utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterHealth {
    /// Accuracy >= 0.986, latency <= 200ms, utilization <= 0.75.
    Optimal,
    /// Accuracy >= 0.95, latency <= 400ms, utilization <= 0.85.
    Good,
    /// Accuracy >= 0.85, latency <= 800ms, utilization <= 0.95.
    Acceptable,
    /// Below every `Acceptable` threshold.
    NeedsOptimization,
}

/// A point-in-time snapshot of the rolling router metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total routing decisions made.
    pub total_requests: u64,
    /// Decisions that did not fall back and whose role had spare capacity.
    pub successful_routes: u64,
    /// Decisions that used the coordinator fallback.
    pub failed_routes: u64,
    /// Count of selections per role name.
    pub role_distribution: BTreeMap<String, u64>,
    /// Rolling average routing latency, in milliseconds.
    pub average_latency_ms: f64,
    /// Rolling average resource utilization across roles, in `[0, 1]`.
    pub resource_utilization: f64,
    /// Derived health tier.
    pub health: RouterHealth,
}

/// Accumulates routing outcomes and derives [`RouterHealth`] from them.
pub struct RouterMetrics {
    /// Mutable rolling state, guarded for concurrent route calls.
    state: RwLock<State>,
}

/// The mutable counters behind a [`RouterMetrics`].
struct State {
    /// Total routing decisions made.
    total_requests: u64,
    /// Decisions that did not use the coordinator fallback.
    successful_routes: u64,
    /// Decisions that used the coordinator fallback.
    failed_routes: u64,
    /// Count of selections per role name.
    role_distribution: BTreeMap<String, u64>,
    /// Running sum of routing latencies, in milliseconds.
    latency_sum_ms: f64,
    /// Running sum of observed resource utilization samples.
    utilization_sum: f64,
}

impl RouterMetrics {
    /// Builds an empty metrics accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                total_requests: 0,
                successful_routes: 0,
                failed_routes: 0,
                role_distribution: BTreeMap::new(),
                latency_sum_ms: 0.0,
                utilization_sum: 0.0,
            }),
        }
    }

    /// Records one routing decision: the selected `role`, whether it used
    /// the fallback, how long routing took, and the observed utilization.
    pub async fn record(&self, role: &str, fallback_mode: bool, latency_ms: f64, utilization: f64) {
        let mut state = self.state.write().await;
        state.total_requests += 1;
        if fallback_mode {
            state.failed_routes += 1;
        } else {
            state.successful_routes += 1;
        }
        *state.role_distribution.entry(role.to_string()).or_insert(0) += 1;
        state.latency_sum_ms += latency_ms;
        state.utilization_sum += utilization;
    }

    /// Returns a snapshot of the rolling counters and derived health.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.read().await;
        #[allow(clippy::cast_precision_loss, reason = "request counts stay far below f64's exact-integer range")]
        let total = state.total_requests as f64;
        let accuracy = if total > 0.0 { state.successful_routes as f64 / total } else { 1.0 };
        let average_latency_ms = if total > 0.0 { state.latency_sum_ms / total } else { 0.0 };
        let resource_utilization = if total > 0.0 { state.utilization_sum / total } else { 0.0 };

        MetricsSnapshot {
            total_requests: state.total_requests,
            successful_routes: state.successful_routes,
            failed_routes: state.failed_routes,
            role_distribution: state.role_distribution.clone(),
            average_latency_ms,
            resource_utilization,
            health: classify_health(accuracy, average_latency_ms, resource_utilization),
        }
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies `(accuracy, latency_ms, utilization)` into a [`RouterHealth`]
/// tier via stepwise threshold relaxation.
fn classify_health(accuracy: f64, latency_ms: f64, utilization: f64) -> RouterHealth {
    if accuracy >= 0.986 && latency_ms <= 200.0 && utilization <= 0.75 {
        RouterHealth::Optimal
    } else if accuracy >= 0.95 && latency_ms <= 400.0 && utilization <= 0.85 {
        RouterHealth::Good
    } else if accuracy >= 0.85 && latency_ms <= 800.0 && utilization <= 0.95 {
        RouterHealth::Acceptable
    } else {
        RouterHealth::NeedsOptimization
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[tokio::test]
    async fn perfect_routing_is_optimal() {
        let metrics = RouterMetrics::new();
        metrics.record("analyst", false, 120.0, 0.4).await;
        metrics.record("analyst", false, 130.0, 0.5).await;
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.health, RouterHealth::Optimal);
    }

    #[tokio::test]
    async fn frequent_fallback_degrades_health() {
        let metrics = RouterMetrics::new();
        for _ in 0..10 {
            metrics.record("coordinator", true, 900.0, 0.97).await;
        }
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.health, RouterHealth::NeedsOptimization);
    }

    #[tokio::test]
    async fn empty_metrics_start_optimal() {
        let metrics = RouterMetrics::new();
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.health, RouterHealth::Optimal);
        assert_eq!(snapshot.total_requests, 0);
    }
}
