// agentflow-core/src/errors.rs
// ============================================================================
// Module: Orchestrator Errors
// Description: Shared error taxonomy returned at the orchestrator's public
//              boundaries.
// Purpose: Give every crate one error type to map into, so the pipeline,
//          CLI, and HTTP ingress can classify failures uniformly.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! `OrchestratorError` is the boundary error type: backends and engines
//! raise their own specific errors (see each crate's `errors` module) and
//! map them into one of these variants where they cross into the pipeline or
//! an HTTP response. The variant chosen decides the HTTP status and whether
//! a retry is attempted upstream.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: OrchestratorError
// ============================================================================

/// Top-level error returned from orchestrator boundaries.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request failed validation before any work started.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A rate limit rejected the request; `retry_after_ms` is advisory.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested delay, in milliseconds, before retrying.
        retry_after_ms: u64,
    },

    /// A circuit breaker is open for the targeted dependency.
    #[error("circuit open for {dependency}")]
    CircuitOpen {
        /// Name of the dependency whose breaker is open.
        dependency: String,
    },

    /// The operation exceeded its deadline.
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time, in milliseconds, before the deadline fired.
        elapsed_ms: u64,
    },

    /// A terminator halted the run before completion.
    #[error("run terminated: {reason:?}")]
    Terminated {
        /// The termination reason recorded on the run.
        reason: crate::model::TerminationReason,
    },

    /// A downstream dependency (role adapter, KV store, webhook transport)
    /// returned an error.
    #[error("upstream error from {source_name}: {message}")]
    Upstream {
        /// Name of the dependency that failed.
        source_name: String,
        /// Error message returned by the dependency.
        message: String,
    },

    /// An invariant the orchestrator relies on was violated; this indicates
    /// a bug rather than bad input or a downstream failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Returns true when a caller retrying the same request might succeed
    /// without any change on their part.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::CircuitOpen { .. } | Self::Timeout { .. })
    }

    /// Returns the conventional HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::RateLimited {
                ..
            } => 429,
            Self::CircuitOpen {
                ..
            } => 503,
            Self::Timeout {
                ..
            } => 504,
            Self::Terminated {
                ..
            } => 422,
            Self::Upstream {
                ..
            } => 502,
            Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn rate_limited_is_retryable_with_429() {
        let err = OrchestratorError::RateLimited {
            retry_after_ms: 500,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), 429);
    }

    #[test]
    fn terminated_is_not_retryable() {
        let err = OrchestratorError::Terminated {
            reason: crate::model::TerminationReason::Unanswerable,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 422);
    }
}
