// agentflow-pipeline/src/errors.rs
// ============================================================================
// Module: Pipeline Errors
// Description: Stage-local error types plus their mapping into the shared
//              OrchestratorError taxonomy (spec §7).
// Purpose: Keep every fallible stage's own vocabulary typed while giving
//          callers one error surface to match against.
// Dependencies: agentflow-core, thiserror
// ============================================================================

use agentflow_cache::CacheError;
use agentflow_core::ArtifactError;
use agentflow_core::OrchestratorError;
use agentflow_core::TenancyError;
use agentflow_core::TerminationReason;
use agentflow_lag::LagError;
use agentflow_rcr::RcrError;
use thiserror::Error;

/// Errors raised while running a single stage of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Preflight rejected the request before a run was opened.
    #[error("preflight rejected the request: {0}")]
    Preflight(#[from] OrchestratorError),
    /// Decomposition failed or the query was malformed.
    #[error("decomposition failed: {0}")]
    Decompose(#[from] LagError),
    /// Role routing failed for a step.
    #[error("routing failed: {0}")]
    Route(#[from] RcrError),
    /// The tenancy quota check could not be evaluated.
    #[error("tenancy check failed: {0}")]
    Tenancy(#[from] TenancyError),
    /// A step exhausted its retries against the role adapter.
    #[error("step {step_id} exhausted {attempts} attempt(s): {message}")]
    StepFailed {
        /// The step that failed.
        step_id: String,
        /// Attempts made before giving up.
        attempts: u32,
        /// The final attempt's error message.
        message: String,
    },
    /// A step or the run as a whole was stopped by a terminator.
    #[error("terminated: {reason:?}")]
    Terminated {
        /// The terminator that fired.
        reason: TerminationReason,
    },
    /// The artifact writer could not record a run artifact.
    #[error("artifact write failed: {0}")]
    Artifact(#[from] ArtifactError),
    /// A cache operation failed; callers treat this as a miss, but the
    /// pipeline surfaces it here when it occurs outside the get/put path
    /// (for example, a bug in strategy construction).
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    /// The run's final verification pass found unmet conditions.
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

impl From<PipelineError> for OrchestratorError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Preflight(inner) => inner,
            PipelineError::Decompose(LagError::EmptyQuery) => Self::InvalidInput("query is empty".to_string()),
            PipelineError::Decompose(LagError::TooLong { max, actual }) => Self::InvalidInput(format!("query length {actual} exceeds max {max}")),
            PipelineError::Decompose(LagError::InvariantViolation(message)) => Self::Internal(message),
            PipelineError::Route(inner) => Self::Upstream { source_name: "rcr".to_string(), message: inner.to_string() },
            PipelineError::Tenancy(inner) => Self::Upstream { source_name: "tenancy".to_string(), message: inner.to_string() },
            PipelineError::StepFailed { step_id, attempts, message } => Self::Upstream { source_name: format!("step:{step_id}"), message: format!("{attempts} attempt(s): {message}") },
            PipelineError::Terminated { reason } => Self::Terminated { reason },
            PipelineError::Artifact(inner) => Self::Internal(inner.to_string()),
            PipelineError::Cache(inner) => Self::Internal(inner.to_string()),
            PipelineError::VerificationFailed(message) => Self::Internal(message),
        }
    }
}
