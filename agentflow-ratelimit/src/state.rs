// agentflow-ratelimit/src/state.rs
// ============================================================================
// Module: Client Admission State
// Description: Per-client algorithm state, violation counters, and the
//              admission result shape returned to callers.
// Purpose: Keep the bookkeeping each algorithm needs separate from the
//          algorithm logic itself.
// Dependencies: std::collections::VecDeque
// ============================================================================

use std::collections::VecDeque;

use crate::algorithm::Algorithm;

/// The outcome of one admission check.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionResult {
    /// Whether the call is admitted.
    pub allowed: bool,
    /// Units remaining in the current window or bucket after this call.
    pub remaining: u32,
    /// The limit in effect for this call (post load-scaling).
    pub limit: u32,
    /// Unix timestamp (seconds) at which the window or bucket resets.
    pub reset_unix: i64,
    /// Algorithm that produced this result.
    pub algorithm: Algorithm,
    /// Set on denial: seconds the caller should wait before retrying.
    pub retry_after: Option<u64>,
}

/// Mutable state backing one client's admission checks under one algorithm.
#[derive(Debug, Clone, Default)]
pub enum AlgorithmState {
    #[default]
    /// No calls admitted yet; initialized lazily on first use.
    Unseen,
    /// Token bucket: fractional tokens remaining and the last refill time.
    TokenBucket {
        /// Tokens currently available, fractional between refills.
        tokens: f64,
        /// Unix millis of the last refill computation.
        last_refill_ms: i64,
    },
    /// Sliding window: timestamps (millis) of admitted calls still inside
    /// the window.
    SlidingWindow {
        /// Millisecond timestamps of calls still within the window.
        timestamps: VecDeque<i64>,
    },
    /// Fixed window: the active window key and its count.
    FixedWindow {
        /// `floor(now_s / window_s)` for the window currently counted.
        window_key: i64,
        /// Calls admitted in the current window.
        count: u32,
    },
    /// Leaky bucket: current volume and the last leak computation time.
    LeakyBucket {
        /// Current queued volume, fractional between leaks.
        volume: f64,
        /// Unix millis of the last leak computation.
        last_leak_ms: i64,
    },
}

/// Violation bookkeeping for one client, independent of the algorithm used.
#[derive(Debug, Clone, Default)]
pub struct ViolationRecord {
    /// Denials observed within the violation-tracking TTL.
    pub violations: u32,
    /// Unix millis at which the violation counter resets.
    pub violations_expire_ms: i64,
    /// Unix millis until which the client is blocked outright, if any.
    pub blocked_until_ms: Option<i64>,
}

/// All state tracked for one client.
#[derive(Debug, Clone, Default)]
pub struct ClientRecord {
    /// Admission algorithm state.
    pub algorithm: AlgorithmState,
    /// Violation/block bookkeeping.
    pub violations: ViolationRecord,
}
