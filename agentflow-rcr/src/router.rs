// agentflow-rcr/src/router.rs
// ============================================================================
// Module: RCR Router
// Description: Binds analysis, scoring, selection, load tracking, and
//              metrics behind one `route` call.
// Purpose: The crate's public entry point: `Route(step, context,
//          requirements) -> RoutingDecision`.
// Dependencies: agentflow-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! `RcrRouter` owns the five canonical roles, the advisory load tracker, and
//! the rolling metrics accumulator for one process. `route` is the only
//! entry point a pipeline needs: it analyzes, scores, selects, records the
//! load increment and the metrics sample, and returns the `RoutingDecision`
//! the pipeline persists.

use std::sync::Arc;

use agentflow_core::Clock;
use agentflow_core::Role;
use agentflow_core::RoleName;
use agentflow_core::RoutingDecision;
use agentflow_core::RunId;
use agentflow_core::StepId;
use agentflow_core::interfaces::KvStore;

use crate::analysis;
use crate::errors::RcrError;
use crate::load::LoadTracker;
use crate::metrics::MetricsSnapshot;
use crate::metrics::RouterMetrics;
use crate::scoring;
use crate::scoring::RoutingRequirements;
use crate::selection;

/// Routes sub-questions to canonical roles and accumulates routing metrics.
pub struct RcrRouter {
    /// The five canonical roles, in tie-break priority order.
    roles: Vec<Role>,
    /// Advisory per-role load tracker.
    loads: LoadTracker,
    /// Rolling routing metrics.
    metrics: RouterMetrics,
    /// Clock used to time each routing decision.
    clock: Arc<dyn Clock>,
}

impl RcrRouter {
    /// Builds a router over the canonical role set with no KV load mirror.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { roles: agentflow_core::canonical_roles(), loads: LoadTracker::new(), metrics: RouterMetrics::new(), clock }
    }

    /// Builds a router whose load tracker mirrors counters into `kv`.
    #[must_use]
    pub fn with_kv(clock: Arc<dyn Clock>, kv: Arc<dyn KvStore>) -> Self {
        Self { roles: agentflow_core::canonical_roles(), loads: LoadTracker::with_kv(kv), metrics: RouterMetrics::new(), clock }
    }

    /// Routes one sub-question to a role.
    ///
    /// # Errors
    ///
    /// Returns [`RcrError::EmptyStep`] when `step` is empty after trimming.
    pub async fn route(
        &self,
        run_id: RunId,
        step_id: StepId,
        step: &str,
        estimated_complexity: f64,
        context: &serde_json::Value,
        requirements: RoutingRequirements,
    ) -> Result<RoutingDecision, RcrError> {
        if step.trim().is_empty() {
            return Err(RcrError::EmptyStep);
        }

        let started = self.clock.now();
        let query = analysis::analyze_query(step, estimated_complexity);
        let context_analysis = analysis::analyze_context(context);
        let loads = self.loads.snapshot().await;
        let scores = scoring::score_roles(&self.roles, &query, &context_analysis, &loads, &requirements);
        let selection = selection::select_role(&self.roles, &scores, &loads);

        self.loads.increment(&selection.role).await;

        let finished = self.clock.now();
        #[allow(clippy::cast_precision_loss, reason = "routing latency stays far below f64's exact-integer range")]
        let latency_ms = finished.saturating_duration_since(started).as_millis() as f64;
        let max_capacity = self.roles.iter().find(|r| r.name == selection.role).map_or(1, |r| r.load_capacity.max(1));
        #[allow(clippy::cast_precision_loss, reason = "load/capacity counts stay far below f64's exact-integer range")]
        let utilization = f64::from(selection.load_before) / f64::from(max_capacity);
        self.metrics.record(selection.role.as_str(), selection.fallback_mode, latency_ms, utilization).await;

        Ok(RoutingDecision {
            run_id,
            step_id,
            selected_role: selection.role,
            normalized_score: selection.score.normalized_score,
            per_dimension_scores: selection.score.per_dimension_scores,
            alternatives: scores,
            load_before: selection.load_before,
            confidence: selection.score.normalized_score,
            fallback_mode: selection.fallback_mode,
        })
    }

    /// Releases one unit of load on `role`, e.g. after a step completes.
    pub async fn release(&self, role: &RoleName) {
        self.loads.decrement(role).await;
    }

    /// Returns a snapshot of the rolling router metrics.
    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agentflow_core::FixedClock;
    use agentflow_core::Timestamp;

    use super::*;

    #[tokio::test]
    async fn routes_a_simple_question_to_some_role() {
        let router = RcrRouter::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        let decision = router
            .route(
                RunId::new("run-1"),
                StepId::new("sq-1"),
                "What is the capital of France?",
                0.1,
                &serde_json::json!({}),
                RoutingRequirements::default(),
            )
            .await
            .unwrap();
        assert!(decision.normalized_score > 0.0);
    }

    #[tokio::test]
    async fn empty_step_is_rejected() {
        let router = RcrRouter::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        let result = router
            .route(RunId::new("run-1"), StepId::new("sq-1"), "   ", 0.1, &serde_json::json!({}), RoutingRequirements::default())
            .await;
        assert!(matches!(result, Err(RcrError::EmptyStep)));
    }

    #[tokio::test]
    async fn repeated_routing_increments_and_reports_load() {
        let router = RcrRouter::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        let requirements = RoutingRequirements { required_capabilities: vec!["analysis".to_string()], ..Default::default() };
        let first =
            router.route(RunId::new("run-1"), StepId::new("sq-1"), "Analyze this market", 0.6, &serde_json::json!({}), requirements.clone()).await.unwrap();
        let second =
            router.route(RunId::new("run-1"), StepId::new("sq-2"), "Analyze this market again", 0.6, &serde_json::json!({}), requirements).await.unwrap();
        if first.selected_role == second.selected_role {
            assert!(second.load_before >= first.load_before);
        }
        let snapshot = router.metrics_snapshot().await;
        assert_eq!(snapshot.total_requests, 2);
    }
}
