// agentflow-ratelimit/src/errors.rs
// ============================================================================
// Module: Rate Limiter Errors
// Description: Errors raised by admission checks and the circuit breaker.
// Purpose: Distinguish "request denied" (not an error, a decision) from
//          backend failures encountered while making that decision.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while evaluating an admission or breaker decision.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The configured limits are internally inconsistent (e.g. zero limit).
    #[error("invalid rate limit configuration: {0}")]
    InvalidLimits(String),
}
