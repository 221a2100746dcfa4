// agentflow-store/src/tenancy.rs
// ============================================================================
// Module: SQLite Tenancy Store
// Description: Per-tenant quota admission and debit (C12's quota check
//              hook), backed by a periodically-resetting counter.
// Purpose: Give the orchestrator's admission path a durable quota backend.
// Dependencies: agentflow-core, rusqlite, tokio
// ============================================================================

//! ## Overview
//! Tenant provisioning and billing are explicit non-goals; this store only
//! answers "is this tenant registered, and do they have budget left", reading
//! a `tenant_quotas` row that some external provisioning process maintains.
//! A quota resets to zero usage once `reset_interval_ms` has elapsed since
//! its last reset, evaluated lazily on the next `check_and_debit` call.

use std::sync::Arc;
use std::sync::Mutex;

use agentflow_core::Clock;
use agentflow_core::QuotaDecision;
use agentflow_core::TenancyError;
use agentflow_core::TenancyStore;
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::config::StoreConfig;
use crate::connection;
use crate::errors::StoreError;

/// Initializes the `tenant_quotas` table if it does not already exist.
fn initialize_schema(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tenant_quotas (
            tenant_id TEXT PRIMARY KEY,
            quota_limit INTEGER NOT NULL,
            used INTEGER NOT NULL,
            reset_interval_ms INTEGER NOT NULL,
            last_reset_at_ms INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

/// `SQLite`-backed [`TenancyStore`].
pub struct SqliteTenancyStore {
    /// Shared connection; see [`crate::kv::SqliteKvStore`] for why a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Source of "now" for reset-window evaluation.
    clock: Arc<dyn Clock>,
}

impl SqliteTenancyStore {
    /// Opens (or creates) a `SQLite` tenancy store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened or its
    /// schema cannot be initialized.
    pub fn open(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let connection = connection::open(config)?;
        initialize_schema(&connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)), clock })
    }

    /// Registers `tenant_id` with `quota_limit` units replenished every
    /// `reset_interval_ms`. A second call for an already-registered tenant
    /// updates its limit and interval without resetting current usage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on a backend failure.
    pub async fn register_tenant(&self, tenant_id: &str, quota_limit: u64, reset_interval_ms: u64) -> Result<(), StoreError> {
        let tenant_id = tenant_id.to_string();
        let now = self.clock.now().as_millis();
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock().map_err(|_err| StoreError::Connection("tenancy store mutex poisoned".to_string()))?;
            guard.execute(
                "INSERT INTO tenant_quotas (tenant_id, quota_limit, used, reset_interval_ms, last_reset_at_ms)
                 VALUES (?1, ?2, 0, ?3, ?4)
                 ON CONFLICT(tenant_id) DO UPDATE SET quota_limit = excluded.quota_limit, reset_interval_ms = excluded.reset_interval_ms",
                params![tenant_id, quota_limit, reset_interval_ms, now],
            )?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl TenancyStore for SqliteTenancyStore {
    async fn check_and_debit(&self, tenant_id: &str, cost: u64) -> Result<QuotaDecision, TenancyError> {
        let tenant_id = tenant_id.to_string();
        let now = self.clock.now().as_millis();
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || debit(&connection, &tenant_id, cost, now))
            .await
            .map_err(|err| TenancyError::Backend(err.to_string()))?
            .map_err(TenancyError::from)
    }
}

/// Reads, resets if due, and debits one tenant's quota row inside a
/// transaction.
fn debit(connection: &Mutex<Connection>, tenant_id: &str, cost: u64, now_ms: i64) -> Result<QuotaDecision, StoreError> {
    let mut guard = connection.lock().map_err(|_err| StoreError::Connection("tenancy store mutex poisoned".to_string()))?;
    let tx = guard.transaction()?;
    let row: Option<(i64, i64, i64, i64)> = tx
        .query_row(
            "SELECT quota_limit, used, reset_interval_ms, last_reset_at_ms FROM tenant_quotas WHERE tenant_id = ?1",
            params![tenant_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;
    let Some((quota_limit, stored_used, reset_interval_ms, last_reset_at_ms)) = row else {
        return Err(StoreError::UnknownTenant(tenant_id.to_string()));
    };

    let due_for_reset = reset_interval_ms > 0 && now_ms.saturating_sub(last_reset_at_ms) >= reset_interval_ms;
    let used = if due_for_reset { 0 } else { stored_used };
    let last_reset_at_ms = if due_for_reset { now_ms } else { last_reset_at_ms };

    #[allow(clippy::cast_sign_loss, reason = "quota columns are written as non-negative by this module")]
    let quota_limit_u = quota_limit as u64;
    #[allow(clippy::cast_sign_loss, reason = "quota columns are written as non-negative by this module")]
    let used_u = used as u64;

    let admitted = used_u.saturating_add(cost) <= quota_limit_u;
    let new_used = if admitted { used_u + cost } else { used_u };
    let remaining = quota_limit_u.saturating_sub(new_used);

    #[allow(clippy::cast_possible_wrap, reason = "new_used is bounded by quota_limit, itself read from an i64 column")]
    let new_used_i = new_used as i64;
    tx.execute(
        "UPDATE tenant_quotas SET used = ?1, last_reset_at_ms = ?2 WHERE tenant_id = ?3",
        params![new_used_i, last_reset_at_ms, tenant_id],
    )?;
    tx.commit()?;
    drop(guard);
    Ok(QuotaDecision { admitted, remaining })
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agentflow_core::FixedClock;
    use agentflow_core::Timestamp;
    use tempfile::tempdir;

    use super::*;

    fn store_at(dir: &tempfile::TempDir, now_ms: i64) -> SqliteTenancyStore {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Timestamp::from_millis(now_ms)));
        SqliteTenancyStore::open(&StoreConfig::at(dir.path().join("tenancy.sqlite3")), clock).unwrap()
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir, 0);
        let err = store.check_and_debit("ghost", 1).await.unwrap_err();
        assert!(matches!(err, TenancyError::UnknownTenant(ref tenant) if tenant == "ghost"));
    }

    #[tokio::test]
    async fn admits_while_under_quota_and_tracks_remaining() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir, 0);
        store.register_tenant("tenant-a", 10, 60_000).await.unwrap();

        let first = store.check_and_debit("tenant-a", 4).await.unwrap();
        assert!(first.admitted);
        assert_eq!(first.remaining, 6);

        let second = store.check_and_debit("tenant-a", 7).await.unwrap();
        assert!(!second.admitted);
        assert_eq!(second.remaining, 6);
    }

    #[tokio::test]
    async fn quota_resets_after_the_interval_elapses() {
        let dir = tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let store = SqliteTenancyStore::open(&StoreConfig::at(dir.path().join("tenancy.sqlite3")), Arc::clone(&clock)).unwrap();
        store.register_tenant("tenant-a", 10, 1_000).await.unwrap();
        store.check_and_debit("tenant-a", 10).await.unwrap();

        let exhausted = store.check_and_debit("tenant-a", 1).await.unwrap();
        assert!(!exhausted.admitted);

        let later: Arc<dyn Clock> = Arc::new(FixedClock::new(Timestamp::from_millis(2_000)));
        let reset_store = SqliteTenancyStore { connection: Arc::clone(&store.connection), clock: later };
        let admitted = reset_store.check_and_debit("tenant-a", 5).await.unwrap();
        assert!(admitted.admitted);
        assert_eq!(admitted.remaining, 5);
    }
}
