// agentflow-ratelimit/src/algorithm.rs
// ============================================================================
// Module: Rate Limit Algorithms and Limits
// Description: The four interchangeable admission algorithms and the limit
//              parameters they share.
// Purpose: Give callers one `Limits`/`Algorithm` pair to select behavior
//          without the limiter's internals leaking into call sites.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! All four algorithms answer the same question — "admit one more unit of
//! work for this client, right now?" — from different internal state.
//! `Limits` carries every parameter any algorithm might need; an algorithm
//! ignores the fields it doesn't use.

use serde::Deserialize;
use serde::Serialize;

/// A selectable admission algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Capacity `C`, refills at `R` per minute; consumes one token per call.
    TokenBucket,
    /// Counts calls within a trailing window of `window_s` seconds.
    SlidingWindow,
    /// Counts calls within the current `⌊now / window_s⌋` bucket.
    FixedWindow,
    /// Volume `V` leaks at `R` per minute; calls add to the volume.
    LeakyBucket,
}

/// Limit parameters shared by every algorithm. A given algorithm reads only
/// the fields relevant to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Bucket capacity (token bucket) or burst size (leaky bucket).
    pub capacity: u32,
    /// Refill or leak rate, in units per minute.
    pub rate_per_min: u32,
    /// Window size in seconds (sliding/fixed window).
    pub window_s: u64,
    /// Admitted count per window (sliding/fixed window).
    pub limit: u32,
}

impl Limits {
    /// Scales `capacity` and `limit` by a `system_load`-derived factor,
    /// per the dynamic-adjustment rule: `load>0.8 → ×0.5; >0.6 → ×0.75;
    /// <0.2 → ×1.5`; otherwise unscaled.
    #[must_use]
    pub fn scaled_for_load(self, system_load: f64) -> Self {
        let factor = if system_load > 0.8 {
            0.5
        } else if system_load > 0.6 {
            0.75
        } else if system_load < 0.2 {
            1.5
        } else {
            1.0
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "scaled limits stay within u32 range for realistic configs")]
        let scale = |value: u32| ((f64::from(value) * factor).round() as u32).max(1);
        Self {
            capacity: scale(self.capacity),
            rate_per_min: self.rate_per_min,
            window_s: self.window_s,
            limit: scale(self.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn high_load_halves_limits() {
        let limits = Limits {
            capacity: 20,
            rate_per_min: 100,
            window_s: 60,
            limit: 100,
        };
        let scaled = limits.scaled_for_load(0.9);
        assert_eq!(scaled.capacity, 10);
        assert_eq!(scaled.limit, 50);
    }

    #[test]
    fn low_load_grows_limits() {
        let limits = Limits {
            capacity: 20,
            rate_per_min: 100,
            window_s: 60,
            limit: 100,
        };
        let scaled = limits.scaled_for_load(0.1);
        assert_eq!(scaled.capacity, 30);
        assert_eq!(scaled.limit, 150);
    }

    proptest::proptest! {
        #[test]
        fn scaled_limits_are_never_zero(capacity in 1u32..10_000, limit in 1u32..10_000, load in 0.0f64..=1.0) {
            let limits = Limits { capacity, rate_per_min: 60, window_s: 60, limit };
            let scaled = limits.scaled_for_load(load);
            assert!(scaled.capacity >= 1);
            assert!(scaled.limit >= 1);
        }
    }
}
