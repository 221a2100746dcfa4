// agentflow-ratelimit/src/limiter.rs
// ============================================================================
// Module: Rate Limiter
// Description: Sharded, algorithm-selectable admission control with
//              violation tracking and block-flag enforcement.
// Purpose: Answer `Admit(clientId, limits)` for the HTTP ingress boundary
//          and for per-step role-adapter calls.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! State is sharded by client id hash, mirroring the cache crate's L1
//! sharding, so concurrent clients rarely contend on the same lock. Each
//! shard owns a map from client id to [`ClientRecord`]. An admit call first
//! checks the block flag; if clear, it runs the selected algorithm and, on
//! denial, updates the violation counter, blocking the client once
//! `max_violations` is reached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use agentflow_core::Timestamp;
use tokio::sync::RwLock;

use crate::algorithm::Algorithm;
use crate::algorithm::Limits;
use crate::state::AdmissionResult;
use crate::state::AlgorithmState;
use crate::state::ClientRecord;

/// Number of shards client state is divided across.
const SHARD_COUNT: usize = 16;

/// Sharded admission-control state for every algorithm.
pub struct RateLimiter {
    /// Per-shard client state maps.
    shards: Vec<RwLock<HashMap<String, ClientRecord>>>,
    /// Denials within the violation TTL after which a client is blocked.
    max_violations: u32,
    /// Lifetime of the violation counter, in milliseconds.
    violations_ttl_ms: i64,
    /// Duration a client stays blocked once `max_violations` is reached.
    block_duration_ms: i64,
}

impl RateLimiter {
    /// Creates a rate limiter. `max_violations` denials within one hour of
    /// each other trigger a block of `block_duration_s` seconds.
    #[must_use]
    pub fn new(max_violations: u32, block_duration_s: u64) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(RwLock::new(HashMap::new()));
        }
        Self {
            shards,
            max_violations,
            violations_ttl_ms: 3_600_000,
            #[allow(clippy::cast_possible_wrap, reason = "block duration in seconds fits comfortably in i64 millis")]
            block_duration_ms: (block_duration_s * 1000) as i64,
        }
    }

    /// Returns the shard index for `client_id`.
    fn shard_index(client_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        client_id.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation, reason = "shard count is a small constant; truncation cannot change the modulus result class")]
        let index = (hasher.finish() % SHARD_COUNT as u64) as usize;
        index
    }

    /// Evaluates admission for `client_id` under `algorithm` with `limits`,
    /// optionally scaled by `system_load` (see
    /// [`Limits::scaled_for_load`]).
    pub async fn admit(
        &self,
        client_id: &str,
        algorithm: Algorithm,
        limits: Limits,
        system_load: Option<f64>,
        now: Timestamp,
    ) -> AdmissionResult {
        let limits = system_load.map_or(limits, |load| limits.scaled_for_load(load));
        let shard = &self.shards[Self::shard_index(client_id)];
        let mut guard = shard.write().await;
        let record = guard.entry(client_id.to_string()).or_default();

        let now_ms = now.as_millis();
        if let Some(blocked_until) = record.violations.blocked_until_ms
            && blocked_until > now_ms
        {
            #[allow(clippy::cast_sign_loss, reason = "blocked_until is always >= now_ms in this branch")]
            let retry_after = ((blocked_until - now_ms) / 1000).max(1) as u64;
            return AdmissionResult {
                allowed: false,
                remaining: 0,
                limit: limits.limit.max(limits.capacity),
                reset_unix: blocked_until / 1000,
                algorithm,
                retry_after: Some(retry_after),
            };
        }

        let (result, new_state) = evaluate(algorithm, &record.algorithm, limits, now_ms);
        record.algorithm = new_state;

        if !result.allowed {
            if record.violations.violations_expire_ms <= now_ms {
                record.violations.violations = 0;
                record.violations.violations_expire_ms = now_ms + self.violations_ttl_ms;
            }
            record.violations.violations += 1;
            if record.violations.violations >= self.max_violations {
                record.violations.blocked_until_ms = Some(now_ms + self.block_duration_ms);
            }
        }

        result
    }
}

/// Runs `algorithm` against `state`, returning the admission result and the
/// state's new value.
fn evaluate(algorithm: Algorithm, state: &AlgorithmState, limits: Limits, now_ms: i64) -> (AdmissionResult, AlgorithmState) {
    match algorithm {
        Algorithm::TokenBucket => token_bucket(state, limits, now_ms),
        Algorithm::SlidingWindow => sliding_window(state, limits, now_ms),
        Algorithm::FixedWindow => fixed_window(state, limits, now_ms),
        Algorithm::LeakyBucket => leaky_bucket(state, limits, now_ms),
    }
}

/// Token bucket: refills `rate_per_min` tokens/minute up to `capacity`,
/// consuming one per admitted call.
#[allow(clippy::cast_precision_loss, reason = "token/volume math operates in f64 and values stay well within exact range for realistic configs")]
fn token_bucket(state: &AlgorithmState, limits: Limits, now_ms: i64) -> (AdmissionResult, AlgorithmState) {
    let (tokens, last_refill_ms) = match *state {
        AlgorithmState::TokenBucket { tokens, last_refill_ms } => (tokens, last_refill_ms),
        _ => (f64::from(limits.capacity), now_ms),
    };
    let elapsed_min = f64::from(u32::try_from((now_ms - last_refill_ms).max(0)).unwrap_or(u32::MAX)) / 60_000.0;
    let refilled = (tokens + elapsed_min * f64::from(limits.rate_per_min)).min(f64::from(limits.capacity));

    if refilled >= 1.0 {
        let remaining_tokens = refilled - 1.0;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "remaining_tokens is bounded in [0, capacity]")]
        let remaining = remaining_tokens.floor() as u32;
        let seconds_to_full = if limits.rate_per_min == 0 {
            0
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "time-to-full is bounded and non-negative")]
            let secs = ((f64::from(limits.capacity) - remaining_tokens) / f64::from(limits.rate_per_min) * 60.0).ceil() as u64;
            secs
        };
        (
            AdmissionResult {
                allowed: true,
                remaining,
                limit: limits.capacity,
                reset_unix: now_ms / 1000 + i64::try_from(seconds_to_full).unwrap_or(i64::MAX),
                algorithm: Algorithm::TokenBucket,
                retry_after: None,
            },
            AlgorithmState::TokenBucket {
                tokens: remaining_tokens,
                last_refill_ms: now_ms,
            },
        )
    } else {
        let deficit = 1.0 - refilled;
        let retry_after = if limits.rate_per_min == 0 {
            1
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "retry_after is bounded and non-negative")]
            let secs = (deficit / f64::from(limits.rate_per_min) * 60.0).ceil().max(1.0) as u64;
            secs
        };
        (
            AdmissionResult {
                allowed: false,
                remaining: 0,
                limit: limits.capacity,
                reset_unix: now_ms / 1000 + i64::try_from(retry_after).unwrap_or(i64::MAX),
                algorithm: Algorithm::TokenBucket,
                retry_after: Some(retry_after),
            },
            AlgorithmState::TokenBucket {
                tokens: refilled,
                last_refill_ms: now_ms,
            },
        )
    }
}

/// Sliding window: admits while fewer than `limit` calls fall within the
/// trailing `window_s` seconds.
fn sliding_window(state: &AlgorithmState, limits: Limits, now_ms: i64) -> (AdmissionResult, AlgorithmState) {
    let mut timestamps = match state {
        AlgorithmState::SlidingWindow { timestamps } => timestamps.clone(),
        _ => VecDeque::new(),
    };
    #[allow(clippy::cast_possible_wrap, reason = "window_s fits comfortably in i64 millis for realistic configs")]
    let window_ms = (limits.window_s * 1000) as i64;
    while let Some(&oldest) = timestamps.front() {
        if now_ms - oldest > window_ms {
            timestamps.pop_front();
        } else {
            break;
        }
    }

    if timestamps.len() < limits.limit as usize {
        timestamps.push_back(now_ms);
        let remaining = limits.limit - u32::try_from(timestamps.len()).unwrap_or(u32::MAX);
        let reset_unix = timestamps.front().copied().unwrap_or(now_ms) / 1000 + i64::try_from(limits.window_s).unwrap_or(i64::MAX);
        (
            AdmissionResult {
                allowed: true,
                remaining,
                limit: limits.limit,
                reset_unix,
                algorithm: Algorithm::SlidingWindow,
                retry_after: None,
            },
            AlgorithmState::SlidingWindow { timestamps },
        )
    } else {
        let oldest = timestamps.front().copied().unwrap_or(now_ms);
        #[allow(clippy::cast_sign_loss, reason = "oldest + window_ms is always >= now_ms in this branch")]
        let retry_after = (((oldest + window_ms - now_ms).max(1_000)) / 1000) as u64;
        (
            AdmissionResult {
                allowed: false,
                remaining: 0,
                limit: limits.limit,
                reset_unix: (oldest + window_ms) / 1000,
                algorithm: Algorithm::SlidingWindow,
                retry_after: Some(retry_after),
            },
            AlgorithmState::SlidingWindow { timestamps },
        )
    }
}

/// Fixed window: admits while fewer than `limit` calls fall within the
/// current `floor(now / window_s)` bucket.
fn fixed_window(state: &AlgorithmState, limits: Limits, now_ms: i64) -> (AdmissionResult, AlgorithmState) {
    let window_s = limits.window_s.max(1);
    #[allow(clippy::cast_sign_loss, reason = "now_ms is always non-negative for real clocks")]
    let now_s = (now_ms / 1000) as u64;
    let key = i64::try_from(now_s / window_s).unwrap_or(i64::MAX);

    let count = match *state {
        AlgorithmState::FixedWindow { window_key, count } if window_key == key => count,
        _ => 0,
    };
    let reset_unix = i64::try_from((u64::try_from(key).unwrap_or(0) + 1) * window_s).unwrap_or(i64::MAX);

    if count < limits.limit {
        let new_count = count + 1;
        (
            AdmissionResult {
                allowed: true,
                remaining: limits.limit - new_count,
                limit: limits.limit,
                reset_unix,
                algorithm: Algorithm::FixedWindow,
                retry_after: None,
            },
            AlgorithmState::FixedWindow {
                window_key: key,
                count: new_count,
            },
        )
    } else {
        #[allow(clippy::cast_sign_loss, reason = "reset_unix is always in the future relative to now_s in this branch")]
        let retry_after = (reset_unix - i64::try_from(now_s).unwrap_or(0)).max(1) as u64;
        (
            AdmissionResult {
                allowed: false,
                remaining: 0,
                limit: limits.limit,
                reset_unix,
                algorithm: Algorithm::FixedWindow,
                retry_after: Some(retry_after),
            },
            AlgorithmState::FixedWindow {
                window_key: key,
                count,
            },
        )
    }
}

/// Leaky bucket: leaks `rate_per_min` volume/minute, admitting while the
/// remaining volume stays under `capacity`.
#[allow(clippy::cast_precision_loss, reason = "volume math operates in f64 and values stay well within exact range for realistic configs")]
fn leaky_bucket(state: &AlgorithmState, limits: Limits, now_ms: i64) -> (AdmissionResult, AlgorithmState) {
    let (volume, last_leak_ms) = match *state {
        AlgorithmState::LeakyBucket { volume, last_leak_ms } => (volume, last_leak_ms),
        _ => (0.0, now_ms),
    };
    let elapsed_min = f64::from(u32::try_from((now_ms - last_leak_ms).max(0)).unwrap_or(u32::MAX)) / 60_000.0;
    let leaked = (volume - elapsed_min * f64::from(limits.rate_per_min)).max(0.0);

    if leaked < f64::from(limits.capacity) {
        let new_volume = leaked + 1.0;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "new_volume is bounded in [0, capacity]")]
        let remaining = (f64::from(limits.capacity) - new_volume).floor().max(0.0) as u32;
        let seconds_to_drain = if limits.rate_per_min == 0 {
            0
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "drain time is bounded and non-negative")]
            let secs = (new_volume / f64::from(limits.rate_per_min) * 60.0).ceil() as u64;
            secs
        };
        (
            AdmissionResult {
                allowed: true,
                remaining,
                limit: limits.capacity,
                reset_unix: now_ms / 1000 + i64::try_from(seconds_to_drain).unwrap_or(i64::MAX),
                algorithm: Algorithm::LeakyBucket,
                retry_after: None,
            },
            AlgorithmState::LeakyBucket {
                volume: new_volume,
                last_leak_ms: now_ms,
            },
        )
    } else {
        let overflow = leaked - f64::from(limits.capacity) + 1.0;
        let retry_after = if limits.rate_per_min == 0 {
            1
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "retry_after is bounded and non-negative")]
            let secs = (overflow / f64::from(limits.rate_per_min) * 60.0).ceil().max(1.0) as u64;
            secs
        };
        (
            AdmissionResult {
                allowed: false,
                remaining: 0,
                limit: limits.capacity,
                reset_unix: now_ms / 1000 + i64::try_from(retry_after).unwrap_or(i64::MAX),
                algorithm: Algorithm::LeakyBucket,
                retry_after: Some(retry_after),
            },
            AlgorithmState::LeakyBucket {
                volume: leaked,
                last_leak_ms: now_ms,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn limits() -> Limits {
        Limits {
            capacity: 2,
            rate_per_min: 60,
            window_s: 60,
            limit: 2,
        }
    }

    #[tokio::test]
    async fn token_bucket_denies_after_capacity_exhausted() {
        let limiter = RateLimiter::new(10, 300);
        let now = Timestamp::from_millis(0);
        let first = limiter.admit("c1", Algorithm::TokenBucket, limits(), None, now).await;
        let second = limiter.admit("c1", Algorithm::TokenBucket, limits(), None, now).await;
        let third = limiter.admit("c1", Algorithm::TokenBucket, limits(), None, now).await;
        assert!(first.allowed);
        assert!(second.allowed);
        assert!(!third.allowed);
        assert!(third.retry_after.is_some());
    }

    #[tokio::test]
    async fn fixed_window_resets_in_the_next_window() {
        let limiter = RateLimiter::new(10, 300);
        let lim = Limits {
            capacity: 2,
            rate_per_min: 60,
            window_s: 1,
            limit: 1,
        };
        let first = limiter.admit("c2", Algorithm::FixedWindow, lim, None, Timestamp::from_millis(0)).await;
        let second = limiter.admit("c2", Algorithm::FixedWindow, lim, None, Timestamp::from_millis(500)).await;
        let third = limiter.admit("c2", Algorithm::FixedWindow, lim, None, Timestamp::from_millis(1_500)).await;
        assert!(first.allowed);
        assert!(!second.allowed);
        assert!(third.allowed);
    }

    #[tokio::test]
    async fn repeated_denials_trigger_a_block() {
        let limiter = RateLimiter::new(2, 300);
        let lim = Limits {
            capacity: 1,
            rate_per_min: 0,
            window_s: 60,
            limit: 1,
        };
        let now = Timestamp::from_millis(0);
        let _ = limiter.admit("c3", Algorithm::TokenBucket, lim, None, now).await;
        let _ = limiter.admit("c3", Algorithm::TokenBucket, lim, None, now).await;
        let _ = limiter.admit("c3", Algorithm::TokenBucket, lim, None, now).await;
        let blocked = limiter.admit("c3", Algorithm::TokenBucket, lim, None, now).await;
        assert!(!blocked.allowed);
        assert!(blocked.retry_after.unwrap() > 0);
    }
}
