// agentflow-pipeline/src/trace.rs
// ============================================================================
// Module: Execution Trace
// Description: One JSON record per line, appended to execution_trace.ndjson
//              as the run progresses (spec §6).
// Purpose: Give the pipeline one typed event per record kind instead of an
//          ad-hoc serde_json::Value built inline at each call site.
// Dependencies: agentflow-core, serde, serde_json
// ============================================================================

use agentflow_core::HashDigest;
use agentflow_core::RoleName;
use agentflow_core::StepId;
use agentflow_core::TerminationReason;
use agentflow_core::Timestamp;
use serde::Serialize;

/// One line of `execution_trace.ndjson`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceRecord {
    /// A run was opened and admitted.
    RunStarted {
        /// When the run started.
        at: Timestamp,
    },
    /// A plan was produced (or the simple-query shortcut taken).
    PlanEmitted {
        /// The plan's content-addressed signature.
        signature: HashDigest,
        /// Number of sub-questions in the plan.
        sub_question_count: usize,
        /// Number of parallel execution groups (the plan's depth).
        depth: usize,
    },
    /// A step began executing.
    StepStarted {
        /// The step starting.
        step_id: StepId,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// A step was routed to a role.
    RouteDecision {
        /// The step routed.
        step_id: StepId,
        /// The role selected.
        role: RoleName,
        /// Normalized score of the selection.
        score: f64,
        /// Whether this was a fallback selection.
        fallback: bool,
    },
    /// A step completed successfully.
    StepCompleted {
        /// The step completing.
        step_id: StepId,
        /// Tokens consumed by the final attempt.
        tokens_used: u64,
        /// Reported confidence.
        confidence: f64,
        /// Whether the result was served from cache.
        from_cache: bool,
    },
    /// A step failed after exhausting retries, or propagated a
    /// non-retryable failure.
    StepFailed {
        /// The step failing.
        step_id: StepId,
        /// Attempts made.
        attempts: u32,
        /// The final error message.
        message: String,
    },
    /// A retry was scheduled after a failed attempt.
    RetryScheduled {
        /// The step being retried.
        step_id: StepId,
        /// The attempt about to be made.
        next_attempt: u32,
        /// Backoff delay before the retry, in milliseconds.
        delay_ms: u64,
    },
    /// A terminator fired, halting the run.
    TerminatorTriggered {
        /// The step active when the terminator fired, if any.
        step_id: Option<StepId>,
        /// The terminator reason.
        reason: TerminationReason,
    },
    /// The run completed successfully.
    RunCompleted {
        /// When the run completed.
        at: Timestamp,
    },
    /// The run failed.
    RunFailed {
        /// When the run failed.
        at: Timestamp,
        /// A human-readable reason.
        reason: String,
    },
    /// The run was terminated (cancelled, or halted by a terminator).
    RunTerminated {
        /// When the run was terminated.
        at: Timestamp,
        /// The termination reason.
        reason: TerminationReason,
    },
}

impl TraceRecord {
    /// Serializes this record as one NDJSON line, including the trailing
    /// newline.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails, which should
    /// not happen for this crate's own record types.
    pub fn to_ndjson_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn records_serialize_with_a_tagged_event_field() {
        let record = TraceRecord::RunStarted { at: Timestamp::from_millis(0) };
        let line = record.to_ndjson_line().unwrap();
        let text = String::from_utf8(line).unwrap();
        assert!(text.starts_with("{\"event\":\"run_started\""));
        assert!(text.ends_with('\n'));
    }
}
