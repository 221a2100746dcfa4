// agentflow-store/src/errors.rs
// ============================================================================
// Module: Store Errors
// Description: The backend's own error type, and its mapping into the
//              KvError/TenancyError the rest of the workspace programs
//              against.
// Purpose: Keep rusqlite's error surface from leaking past this crate.
// Dependencies: agentflow-core, rusqlite, thiserror
// ============================================================================

use agentflow_core::KvError;
use agentflow_core::TenancyError;
use thiserror::Error;

/// Errors raised by the `SQLite`-backed store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection could not be opened or a pragma could not be applied.
    #[error("store connection error: {0}")]
    Connection(String),
    /// A query or statement failed against an open connection.
    #[error("store query error: {0}")]
    Query(String),
    /// A stored value failed to (de)serialize.
    #[error("store encoding error: {0}")]
    Encoding(String),
    /// The backing blocking task panicked or was cancelled.
    #[error("store task error: {0}")]
    Task(String),
    /// A tenancy operation named a `tenant_id` with no registered quota row.
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
}

impl From<StoreError> for KvError {
    fn from(error: StoreError) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<StoreError> for TenancyError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownTenant(tenant_id) => Self::UnknownTenant(tenant_id),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Query(error.to_string())
    }
}
