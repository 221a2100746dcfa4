// agentflow-core/src/model.rs
// ============================================================================
// Module: Domain Model
// Description: Run, Plan, SubQ, Step Execution, Role, Routing Decision, and
//              Termination types shared by every orchestration crate.
// Purpose: Give every crate a single, serializable vocabulary for the
//          entities described in the data model.
// Dependencies: crate::ids, crate::clock, serde
// ============================================================================

//! ## Overview
//! These types are intentionally passive: they hold state, they do not
//! compute it. The LAG engine, RCR router, and pipeline own the state
//! transitions; this module only defines the shapes and the invariants those
//! transitions must preserve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::clock::Timestamp;
use crate::hashing::HashDigest;
use crate::ids::CacheKey;
use crate::ids::CorrelationId;
use crate::ids::DeliveryId;
use crate::ids::RoleName;
use crate::ids::RunId;
use crate::ids::StepId;
use crate::ids::SubQuestionId;
use crate::ids::TenantId;
use crate::ids::WebhookId;

// ============================================================================
// SECTION: Run
// ============================================================================

/// Lifecycle status of a [`Run`]. Monotone except `Pending -> *`; there is no
/// transition out of a terminal state (`Completed`, `Failed`, `Terminated`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not yet planned.
    Pending,
    /// Decomposition in progress.
    Planning,
    /// Plan steps are executing.
    Executing,
    /// Verification passed; all artifacts written.
    Completed,
    /// Verification failed or an internal invariant was violated.
    Failed,
    /// A terminator halted execution before completion.
    Terminated,
}

impl RunStatus {
    /// Returns true for states that accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Terminated)
    }
}

/// A single orchestration request and everything produced while serving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier.
    pub run_id: RunId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Caller-supplied correlation identifier.
    pub correlation_id: Option<CorrelationId>,
    /// Deterministic seed frozen at preflight.
    pub seed: u64,
    /// Sampling temperature, clamped to `<= 0.2` at preflight.
    pub temperature: f64,
    /// Original user query.
    pub query: String,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Creation timestamp.
    pub started_at: Timestamp,
    /// Completion timestamp, set once `status` is terminal.
    pub completed_at: Option<Timestamp>,
    /// Number of steps in the plan, zero before planning completes.
    pub step_count: usize,
    /// Cumulative tokens consumed across all step executions.
    pub token_total: u64,
    /// Canonical-hash snapshot of the configuration used for this run.
    pub config_snapshot: HashDigest,
    /// Filesystem path under which artifacts for this run are written.
    pub artifacts_path: String,
}

impl Run {
    /// Returns true when the run may still accept new step executions.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, RunStatus::Planning | RunStatus::Executing)
    }
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// A single decomposed sub-question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQ {
    /// Sub-question identifier, monotonically assigned within a run.
    pub id: SubQuestionId,
    /// Sub-question text.
    pub text: String,
    /// Parent sub-question, if this one was produced by further
    /// decomposition.
    pub parent_id: Option<SubQuestionId>,
    /// Estimated complexity in `[0, 1]`.
    pub estimated_complexity: f64,
    /// Termination conditions checked before and after this step executes.
    pub termination_checks: Vec<TerminationReason>,
}

/// A directed acyclic dependency graph over sub-question ids: edge `(a, b)`
/// means `b` depends on `a` and `a` precedes `b` in `order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepGraph {
    /// Adjacency list: id -> ids it depends on (its predecessors).
    pub predecessors: BTreeMap<SubQuestionId, Vec<SubQuestionId>>,
}

impl DepGraph {
    /// Returns the predecessors of `id`, or an empty slice if it has none.
    #[must_use]
    pub fn predecessors_of(&self, id: &SubQuestionId) -> &[SubQuestionId] {
        self.predecessors.get(id).map_or(&[], Vec::as_slice)
    }
}

/// A decomposed, ordered plan produced by the LAG engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Owning run.
    pub run_id: RunId,
    /// Cognitive load score that triggered decomposition.
    pub cognitive_load: f64,
    /// All sub-questions in the plan.
    pub sub_questions: Vec<SubQ>,
    /// Dependency graph over sub-question ids.
    pub depgraph: DepGraph,
    /// Topologically sorted execution order, ties broken by ascending id.
    pub order: Vec<SubQuestionId>,
    /// BFS layers over the DAG: `parallel_groups[k]` contains every id whose
    /// predecessors are all in `parallel_groups[<k]`.
    pub parallel_groups: Vec<Vec<SubQuestionId>>,
    /// Stable hash of `(order, edges, normalized sub-question text)`.
    pub signature: HashDigest,
}

impl Plan {
    /// Returns true when the plan required no decomposition (a single step
    /// plan with full budget).
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.sub_questions.len() == 1 && self.depgraph.predecessors.is_empty()
    }

    /// Returns the maximum depth of the plan's dependency chains.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parallel_groups.len()
    }
}

// ============================================================================
// SECTION: Termination
// ============================================================================

/// Reasons a terminator may halt a run. The first triggered condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No answer can be produced from available evidence.
    Unanswerable,
    /// Sub-questions or evidence contradict each other.
    Contradiction,
    /// Supporting evidence confidence is too low.
    LowSupport,
    /// A predecessor step failed or was skipped.
    DependencyFailure,
    /// A sub-question duplicates a prior one.
    RedundancyDetected,
    /// Decomposition depth exceeded `max_depth`.
    RecursionLimit,
    /// A step's confidence fell below `confidence_threshold`.
    ConfidenceThreshold,
}

// ============================================================================
// SECTION: Step Execution
// ============================================================================

/// Lifecycle status of a [`StepExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Queued, not yet dispatched.
    Pending,
    /// Currently executing; at most one per `(run_id, step_id)`.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Skipped because a predecessor failed or a terminator fired.
    Skipped,
}

/// One attempt at executing a plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    /// Owning run.
    pub run_id: RunId,
    /// Step (sub-question) identifier.
    pub step_id: StepId,
    /// Role selected to execute this attempt.
    pub role: RoleName,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Token budget allotted to this attempt.
    pub token_budget: u64,
    /// Tokens actually consumed.
    pub tokens_used: u64,
    /// Digest of the input passed to the role adapter.
    pub input_digest: HashDigest,
    /// Digest of the output returned by the role adapter, once completed.
    pub output_digest: Option<HashDigest>,
    /// Confidence reported by the role adapter, in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Dispatch timestamp.
    pub started_at: Timestamp,
    /// Completion timestamp, set once `status` leaves `Running`.
    pub completed_at: Option<Timestamp>,
    /// Current status.
    pub status: StepStatus,
    /// Error description, set only when `status == Failed`.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Role
// ============================================================================

/// A static, per-process role definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Canonical role name.
    pub name: RoleName,
    /// Capability tags this role supports.
    pub capabilities: Vec<String>,
    /// Maximum cognitive load this role is suited for, in `[0, 1]`.
    pub complexity_max: f64,
    /// Maximum number of concurrently in-flight steps.
    pub load_capacity: u32,
    /// Average response time, in milliseconds.
    pub response_time_avg_ms: u32,
}

/// Returns the five canonical roles in their tie-break priority order:
/// `coordinator, validator, analyst, synthesizer, specialist`.
#[must_use]
pub fn canonical_roles() -> Vec<Role> {
    vec![
        Role {
            name: RoleName::new("coordinator"),
            capabilities: vec!["planning".to_string(), "delegation".to_string()],
            complexity_max: 0.4,
            load_capacity: 8,
            response_time_avg_ms: 150,
        },
        Role {
            name: RoleName::new("validator"),
            capabilities: vec!["verification".to_string(), "fact_check".to_string()],
            complexity_max: 0.5,
            load_capacity: 6,
            response_time_avg_ms: 200,
        },
        Role {
            name: RoleName::new("analyst"),
            capabilities: vec!["analysis".to_string(), "comparison".to_string()],
            complexity_max: 0.8,
            load_capacity: 5,
            response_time_avg_ms: 350,
        },
        Role {
            name: RoleName::new("synthesizer"),
            capabilities: vec!["synthesis".to_string(), "summarization".to_string()],
            complexity_max: 0.9,
            load_capacity: 4,
            response_time_avg_ms: 400,
        },
        Role {
            name: RoleName::new("specialist"),
            capabilities: vec!["domain_expertise".to_string(), "deep_reasoning".to_string()],
            complexity_max: 1.0,
            load_capacity: 3,
            response_time_avg_ms: 600,
        },
    ]
}

// ============================================================================
// SECTION: Routing Decision
// ============================================================================

/// Per-dimension and alternative role scores recorded for one routing
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleScore {
    /// Role this score applies to.
    pub role: RoleName,
    /// Normalized score in `[0, 1]`.
    pub normalized_score: f64,
    /// Raw per-dimension scores before weighting.
    pub per_dimension_scores: BTreeMap<String, f64>,
}

/// The outcome of routing one step to a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Owning run.
    pub run_id: RunId,
    /// Step this decision routed.
    pub step_id: StepId,
    /// Selected role.
    pub selected_role: RoleName,
    /// Selected role's normalized score.
    pub normalized_score: f64,
    /// Per-dimension scores for the selected role.
    pub per_dimension_scores: BTreeMap<String, f64>,
    /// Scores for every role that was considered.
    pub alternatives: Vec<RoleScore>,
    /// Role load observed immediately before selection.
    pub load_before: u32,
    /// Confidence in the routing decision itself (not the eventual answer).
    pub confidence: f64,
    /// True when no role cleared the admission threshold and `coordinator`
    /// was used as a fallback.
    pub fallback_mode: bool,
}

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// A single tiered-cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key.
    pub key: CacheKey,
    /// Cached JSON value.
    pub value: serde_json::Value,
    /// Insertion timestamp.
    pub created_at: Timestamp,
    /// Last access timestamp, updated on every hit for LRU.
    pub accessed_at: Timestamp,
    /// Expiry timestamp.
    pub expires_at: Timestamp,
    /// Serialized size in bytes, used for L1 byte-budget accounting.
    pub size: usize,
    /// Number of times this entry has been read.
    pub access_count: u64,
    /// Keys that depend on this one: invalidating `key` cascades to these.
    pub dependencies: Vec<CacheKey>,
}

impl CacheEntry {
    /// Returns true when `at` is past `expires_at`.
    #[must_use]
    pub fn is_expired(&self, at: Timestamp) -> bool {
        at >= self.expires_at
    }
}

// ============================================================================
// SECTION: Webhook
// ============================================================================

/// Retry configuration for a webhook endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum delivery attempts.
    pub max_attempts: u32,
    /// Base backoff, in milliseconds.
    pub base_backoff_ms: u64,
    /// Backoff cap, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}

/// A registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    /// Endpoint identifier.
    pub id: WebhookId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Delivery URL.
    pub url: String,
    /// Event types this endpoint is subscribed to.
    pub events: Vec<String>,
    /// Shared secret used to sign outbound payloads.
    pub secret: String,
    /// Whether the endpoint currently accepts deliveries.
    pub active: bool,
    /// Per-request timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Whether TLS certificate verification is required.
    pub verify_ssl: bool,
    /// Retry policy for this endpoint.
    pub retry_config: RetryConfig,
    /// Reason the endpoint was auto-disabled, if any.
    pub disabled_reason: Option<String>,
    /// Timestamp at which the endpoint was auto-disabled, if any.
    pub disabled_at: Option<Timestamp>,
}

/// One delivery attempt record for a webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// Endpoint this delivery targeted.
    pub webhook_id: WebhookId,
    /// Delivery identifier, stable across retries of the same event.
    pub delivery_id: DeliveryId,
    /// Event type delivered.
    pub event_type: String,
    /// Digest of the payload body.
    pub payload_digest: HashDigest,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// HTTP status code received, if the request completed.
    pub status_code: Option<u16>,
    /// Wall-clock duration of the attempt, in milliseconds.
    pub duration_ms: u64,
    /// Whether the attempt succeeded (status in `[200, 300)`).
    pub success: bool,
    /// Error description for a failed attempt.
    pub error: Option<String>,
    /// Timestamp the attempt was made.
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn canonical_roles_has_five_in_tie_break_order() {
        let roles = canonical_roles();
        let names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();
        assert_eq!(names, vec!["coordinator", "validator", "analyst", "synthesizer", "specialist"]);
    }

    #[test]
    fn run_status_terminal_states_have_no_exit() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Terminated.is_terminal());
        assert!(!RunStatus::Executing.is_terminal());
    }
}
