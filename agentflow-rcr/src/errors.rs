// agentflow-rcr/src/errors.rs
// ============================================================================
// Module: RCR Errors
// Description: Failure modes surfaced by query/context analysis and routing.
// Purpose: Give callers a typed, non-panicking error surface.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Failures the router can report.
#[derive(Debug, Error)]
pub enum RcrError {
    /// `step` text was empty after trimming.
    #[error("step text is empty")]
    EmptyStep,
    /// No canonical role exists at all, which should be unreachable given
    /// `canonical_roles` always returns five.
    #[error("no candidate roles available")]
    NoCandidates,
}
