// agentflow-cache/src/errors.rs
// ============================================================================
// Module: Cache Errors
// Description: Errors raised by the tiered cache.
// Purpose: Distinguish backend failures from serialization failures so
//          callers can decide whether a cache miss is safe to treat as a
//          cold start.
// Dependencies: agentflow-core, thiserror
// ============================================================================

//! ## Overview
//! Per spec's error-handling policy, caching errors are logged but never
//! fail a Run; callers of [`crate::tiered::TieredCache`] are expected to
//! treat any `CacheError` as "proceed as if this were a miss" rather than
//! propagate it.

use agentflow_core::interfaces::KvError;
use thiserror::Error;

/// Errors raised by tiered cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A remote or durable tier backend failed.
    #[error("cache backend error: {0}")]
    Backend(#[from] KvError),
    /// A cached value failed to serialize or deserialize.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}
