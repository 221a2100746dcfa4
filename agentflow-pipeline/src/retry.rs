// agentflow-pipeline/src/retry.rs
// ============================================================================
// Module: Step Retry Policy
// Description: Exponential backoff with full jitter for retrying a step's
//              role adapter call, distinct from the webhook crate's own
//              retry policy (different base, cap, and termination rule).
// Purpose: Implement spec §4.3's retry policy: up to max_retries attempts,
//          backoff starting at 250ms; a timeout or terminator result is
//          never retried, it propagates immediately.
// Dependencies: agentflow-core
// ============================================================================

use std::time::Duration;

use agentflow_core::Prng;

/// Starting backoff for step retries, per spec §4.3.
const BASE_BACKOFF_MS: u64 = 250;

/// Returns the jittered backoff before retrying `attempt` (1-indexed,
/// meaning the delay before the *next* attempt after `attempt` failed),
/// capped at `step_timeout_ms` so a retry can never itself exceed the
/// step's own deadline.
#[must_use]
pub fn step_backoff_delay(attempt: u32, step_timeout_ms: u64, prng: &Prng) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let unjittered_ms = BASE_BACKOFF_MS.saturating_mul(1u64 << exponent).min(step_timeout_ms.max(BASE_BACKOFF_MS));
    prng.jitter(Duration::from_millis(unjittered_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_the_step_timeout() {
        let prng = Prng::from_seed(7);
        for attempt in 1..10 {
            let delay = step_backoff_delay(attempt, 1_000, &prng);
            assert!(delay <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn first_retry_is_bounded_by_the_base_backoff() {
        let prng = Prng::from_seed(7);
        let delay = step_backoff_delay(1, 10_000, &prng);
        assert!(delay < Duration::from_millis(BASE_BACKOFF_MS));
    }

    proptest::proptest! {
        #[test]
        fn delay_never_exceeds_the_step_timeout(attempt in 1u32..50, step_timeout_ms in 1u64..60_000) {
            let prng = Prng::from_seed(attempt.into());
            let delay = step_backoff_delay(attempt, step_timeout_ms, &prng);
            assert!(delay <= Duration::from_millis(step_timeout_ms.max(BASE_BACKOFF_MS)));
        }
    }
}
