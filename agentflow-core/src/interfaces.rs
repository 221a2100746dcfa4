// agentflow-core/src/interfaces.rs
// ============================================================================
// Module: Backend Interfaces
// Description: Async traits at every I/O boundary the orchestrator crosses.
// Purpose: Let the pipeline, cache, and webhook crates depend on behavior,
//          not on a concrete backend, so a SQLite store and a remote KV
//          service are interchangeable.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! Every backend-shaped dependency the orchestrator has is expressed here as
//! a trait: a key/value store, a role adapter (the thing that actually
//! answers a sub-question), a secret source, an artifact sink, and a webhook
//! transport. Concrete implementations live in `agentflow-store`,
//! `agentflow-webhook`, and the role-adapter implementations supplied by the
//! host application; this crate only defines the contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::CacheKey;
use crate::ids::RoleName;

// ============================================================================
// SECTION: KvStore
// ============================================================================

/// Errors raised by a [`KvStore`] implementation.
#[derive(Debug, Error)]
pub enum KvError {
    /// The backend itself failed (connection, I/O, serialization).
    #[error("kv backend error: {0}")]
    Backend(String),
}

/// A key/value store used for the L2/L3 cache tiers and for durable run
/// state.
///
/// Implementations must treat `set` with an `Option::None` ttl as
/// non-expiring and must make `delete` idempotent (deleting an absent key is
/// not an error).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the raw bytes stored at `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Backend`] on a backend failure.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, KvError>;

    /// Writes `value` at `key`, expiring after `ttl_ms` milliseconds when
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Backend`] on a backend failure.
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<(), KvError>;

    /// Removes `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Backend`] on a backend failure.
    async fn delete(&self, key: &CacheKey) -> Result<(), KvError>;

    /// Returns every key carrying the given prefix.
    ///
    /// Used by dependency-graph invalidation to find candidate descendants
    /// without requiring the backend to support a secondary index.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Backend`] on a backend failure.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<CacheKey>, KvError>;
}

// ============================================================================
// SECTION: RoleAdapter
// ============================================================================

/// Errors raised by a [`RoleAdapter`] implementation.
#[derive(Debug, Error)]
pub enum RoleAdapterError {
    /// The adapter's upstream call failed.
    #[error("role adapter call failed: {0}")]
    CallFailed(String),
    /// The adapter's upstream call exceeded its deadline.
    #[error("role adapter call timed out after {elapsed_ms}ms")]
    TimedOut {
        /// Elapsed time, in milliseconds, before the deadline fired.
        elapsed_ms: u64,
    },
}

/// A request dispatched to a role adapter for one step execution.
#[derive(Debug, Clone)]
pub struct RoleRequest {
    /// Role selected to handle this request.
    pub role: RoleName,
    /// Sub-question (or composed prompt) text.
    pub input: String,
    /// Token budget allotted to this attempt.
    pub token_budget: u64,
    /// Sampling temperature, already clamped by the pipeline.
    pub temperature: f64,
}

/// The response returned by a role adapter for one step execution.
#[derive(Debug, Clone)]
pub struct RoleResponse {
    /// Generated answer text.
    pub output: String,
    /// Tokens actually consumed producing `output`.
    pub tokens_used: u64,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
}

/// A backend that can answer a sub-question in the role it was assigned.
///
/// This is the seam at which a host application plugs in an actual language
/// model, tool, or deterministic test double.
#[async_trait]
pub trait RoleAdapter: Send + Sync {
    /// Executes `request` and returns the role's answer.
    ///
    /// # Errors
    ///
    /// Returns [`RoleAdapterError`] when the call fails or times out.
    async fn execute(&self, request: RoleRequest) -> Result<RoleResponse, RoleAdapterError>;
}

// ============================================================================
// SECTION: SecretSource
// ============================================================================

/// Errors raised by a [`SecretSource`] implementation.
#[derive(Debug, Error)]
pub enum SecretError {
    /// No secret is registered under the requested name.
    #[error("secret not found: {0}")]
    NotFound(String),
    /// The backend failed to retrieve the secret.
    #[error("secret backend error: {0}")]
    Backend(String),
}

/// A source of named secrets (webhook signing keys, upstream API keys).
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Returns the secret registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::NotFound`] when no secret exists under `name`,
    /// or [`SecretError::Backend`] on a backend failure.
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

// ============================================================================
// SECTION: ArtifactSink
// ============================================================================

/// Errors raised by an [`ArtifactSink`] implementation.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Writing the artifact failed.
    #[error("failed to write artifact {name}: {message}")]
    WriteFailed {
        /// Artifact file name.
        name: String,
        /// Underlying error message.
        message: String,
    },
}

/// A destination for run artifacts (`preflight_plan.json`,
/// `execution_trace.ndjson`, `router_metrics.json`, `meta_report.md`).
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Writes `bytes` as the artifact named `name` under the given run's
    /// artifact directory.
    ///
    /// Implementations append rather than overwrite when `name` ends in
    /// `.ndjson`, and overwrite otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::WriteFailed`] when the write fails.
    async fn write_artifact(&self, run_id: &str, name: &str, bytes: &[u8]) -> Result<(), ArtifactError>;
}

// ============================================================================
// SECTION: WebhookTransport
// ============================================================================

/// Errors raised by a [`WebhookTransport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent at all (DNS, connect, TLS).
    #[error("transport error: {0}")]
    Send(String),
}

/// An outbound HTTP response as observed by a [`WebhookTransport`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code received.
    pub status_code: u16,
    /// Response body, truncated by the implementation as it sees fit.
    pub body: Vec<u8>,
}

/// The outbound HTTP boundary used for webhook delivery.
///
/// Kept separate from a raw `reqwest::Client` so host-allow/denylist
/// enforcement and test doubles can wrap it without every caller needing to
/// know about either.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Sends a signed POST request to `url` with `headers` and `body`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] when the request cannot be sent.
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
        timeout_ms: u64,
    ) -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// SECTION: TenancyStore
// ============================================================================

/// Errors raised by a [`TenancyStore`] implementation.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// The tenant is not registered.
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
    /// The backend failed to evaluate the quota.
    #[error("tenancy backend error: {0}")]
    Backend(String),
}

/// The quota decision returned by a [`TenancyStore`] admission check.
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    /// Whether the request is admitted under the tenant's quota.
    pub admitted: bool,
    /// Remaining budget after this request, if admitted.
    pub remaining: u64,
}

/// Per-tenant quota and isolation bookkeeping.
#[async_trait]
pub trait TenancyStore: Send + Sync {
    /// Checks and, if admitted, debits `cost` units from `tenant_id`'s
    /// quota.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyError::UnknownTenant`] when the tenant is not
    /// registered, or [`TenancyError::Backend`] on a backend failure.
    async fn check_and_debit(&self, tenant_id: &str, cost: u64) -> Result<QuotaDecision, TenancyError>;
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    struct AlwaysAdmits;

    #[async_trait]
    impl TenancyStore for AlwaysAdmits {
        async fn check_and_debit(&self, _tenant_id: &str, cost: u64) -> Result<QuotaDecision, TenancyError> {
            Ok(QuotaDecision {
                admitted: true,
                remaining: 1_000 - cost,
            })
        }
    }

    #[tokio::test]
    async fn trait_object_is_dyn_compatible() {
        let store: Box<dyn TenancyStore> = Box::new(AlwaysAdmits);
        let decision = store.check_and_debit("tenant-a", 10).await.unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 990);
    }
}
