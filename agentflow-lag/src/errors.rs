// agentflow-lag/src/errors.rs
// ============================================================================
// Module: LAG Errors
// Description: Failure modes for decomposition itself, as opposed to a
//              terminator halting an otherwise-valid plan.
// Purpose: Keep "malformed input" and "internal invariant violated" distinct
//          from the terminator outcomes a caller must also handle.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::engine::decompose`]. Per the decomposition
/// contract, these are the only two ways decomposition itself fails; every
/// other halt is a [`agentflow_core::TerminationReason`] returned as a
/// normal outcome, not an error.
#[derive(Debug, Error)]
pub enum LagError {
    /// The query was empty after trimming.
    #[error("query is empty")]
    EmptyQuery,
    /// The query exceeded the configured maximum length.
    #[error("query length {actual} exceeds maximum {max}")]
    TooLong {
        /// Configured maximum length, in characters.
        max: usize,
        /// Actual query length, in characters.
        actual: usize,
    },
    /// An internal invariant (e.g. a cyclic dependency graph) was violated.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
