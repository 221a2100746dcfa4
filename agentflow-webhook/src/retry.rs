// agentflow-webhook/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Capped exponential backoff with jitter, and the terminal
//              status code list.
// Purpose: Decide how long to wait between delivery attempts, and which
//          failures should not be retried at all.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! `backoff_delay` implements `min(cap, base * 2^(attempt-1)) ± jitter`.
//! Jitter is drawn from the run's seeded [`Prng`] so replaying a run
//! reproduces identical wait times.

use std::time::Duration;

use agentflow_core::Prng;

/// HTTP status codes that end the retry loop immediately, regardless of
/// remaining attempts: the endpoint has told us the resource is permanently
/// gone.
const TERMINAL_STATUS_CODES: &[u16] = &[410];

/// Returns true when `status` should not be retried.
#[must_use]
pub fn is_terminal_status(status: u16) -> bool {
    TERMINAL_STATUS_CODES.contains(&status)
}

/// Computes `min(cap, base * 2^(attempt-1))`, jittered by up to ±20% of the
/// uncapped delay. `attempt` is 1-based.
#[must_use]
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64, prng: &Prng) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let scaled = base_ms.saturating_mul(1u64.checked_shl(exponent).unwrap_or(u64::MAX).max(1));
    let capped = scaled.min(max_ms);
    let jitter_span = capped / 5;
    if jitter_span == 0 {
        return Duration::from_millis(capped);
    }
    let offset = prng.jitter(Duration::from_millis(jitter_span * 2));
    let floor = capped.saturating_sub(jitter_span);
    #[allow(clippy::cast_possible_truncation, reason = "offset is bounded by jitter_span*2, far below u64::MAX")]
    Duration::from_millis(floor + offset.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn terminal_codes_are_not_retried() {
        assert!(is_terminal_status(410));
        assert!(!is_terminal_status(500));
        assert!(!is_terminal_status(200));
    }

    #[test]
    fn backoff_grows_with_attempt_and_respects_the_cap() {
        let prng = Prng::from_seed(7);
        let first = backoff_delay(1, 1_000, 60_000, &prng);
        let third = backoff_delay(3, 1_000, 60_000, &prng);
        assert!(first.as_millis() <= 1_200);
        assert!(third.as_millis() >= 3_200 && third.as_millis() <= 4_800);
    }

    #[test]
    fn backoff_never_exceeds_the_cap_plus_jitter_span() {
        let prng = Prng::from_seed(11);
        let delay = backoff_delay(20, 1_000, 60_000, &prng);
        assert!(delay.as_millis() <= 60_000 + 60_000 / 5);
    }

    proptest::proptest! {
        #[test]
        fn backoff_stays_within_jittered_cap(attempt in 1u32..30, base in 1u64..5_000, cap in 5_000u64..120_000) {
            let prng = Prng::from_seed(3);
            let delay = backoff_delay(attempt, base, cap, &prng);
            assert!(delay.as_millis() <= u128::from(cap) + u128::from(cap / 5) + 1);
        }
    }
}
