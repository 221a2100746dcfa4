// agentflow-core/src/clock.rs
// ============================================================================
// Module: Clock and Seeded Random
// Description: Monotonic time and seeded PRNG, the single source of
//              timestamps, jitter, and id allocation.
// Purpose: Keep wall-clock time and randomness out of plan structure so
//          orchestration stays reproducible under a fixed seed.
// Dependencies: std::time, rand
// ============================================================================

//! ## Overview
//! `Clock` and `Prng` are separated deliberately (design note, §9): wall-clock
//! time must never influence plan structure, only timestamps recorded
//! alongside it. Every place that needs jitter, tie-break, or id allocation
//! draws from a `Prng` seeded once per run from [`OrchestratorConfig`]'s seed
//! so re-running the same `(query, context, seed)` is byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Millisecond-precision Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Builds a timestamp from raw Unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp as Unix seconds, truncated toward zero.
    #[must_use]
    pub const fn as_unix_secs(self) -> i64 {
        self.0 / 1000
    }

    /// Returns the duration since `other`, or zero if `other` is later.
    #[must_use]
    pub fn saturating_duration_since(self, other: Self) -> Duration {
        if self.0 <= other.0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_sign_loss, reason = "difference is checked non-negative above")]
        Duration::from_millis((self.0 - other.0) as u64)
    }
}

/// Clock abstraction supplying monotonic-for-ordering wall-clock timestamps.
///
/// Implementations must be cheap and thread-safe; they are called on every
/// hot path (trigger handling, cache access, rate-limit admission).
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// System clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_millis(millis)
    }
}

/// Fixed clock for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// The timestamp always returned by [`Clock::now`].
    at: Timestamp,
}

impl FixedClock {
    /// Creates a clock that always reports `at`.
    #[must_use]
    pub const fn new(at: Timestamp) -> Self {
        Self {
            at,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.at
    }
}

// ============================================================================
// SECTION: Seeded PRNG
// ============================================================================

/// Deterministic pseudo-random source for jitter, tie-break, and id
/// allocation.
///
/// Wraps a `StdRng` behind a mutex so it can be shared across worker tasks
/// while remaining a single, seed-reproducible stream.
pub struct Prng {
    /// Interior-mutable RNG state.
    inner: Mutex<StdRng>,
}

impl Prng {
    /// Creates a PRNG seeded deterministically from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Returns the next `u64` in the stream.
    #[allow(clippy::unwrap_used, reason = "mutex is never poisoned: no panics occur while held")]
    #[must_use]
    pub fn next_u64(&self) -> u64 {
        self.inner.lock().unwrap().next_u64()
    }

    /// Returns a jitter duration in `[0, max)`, full-jitter style.
    #[must_use]
    pub fn jitter(&self, max: Duration) -> Duration {
        let max_millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.next_u64() % max_millis)
    }

    /// Generates a UUIDv4 identifier string from the seeded stream.
    ///
    /// This draws from the same deterministic stream as jitter and tie-break
    /// so replaying a run with the same seed produces the same delivery ids.
    #[must_use]
    pub fn uuid_v4(&self) -> String {
        let hi = self.next_u64();
        let lo = self.next_u64();
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&hi.to_be_bytes());
        bytes[8..].copy_from_slice(&lo.to_be_bytes());
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn same_seed_produces_same_stream() {
        let a = Prng::from_seed(42);
        let b = Prng::from_seed(42);
        assert_eq!(a.next_u64(), b.next_u64());
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = Prng::from_seed(1);
        let b = Prng::from_seed(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::new(Timestamp::from_millis(1_000));
        assert_eq!(clock.now().as_millis(), 1_000);
        assert_eq!(clock.now().as_millis(), 1_000);
    }
}
