// agentflow-store/src/kv.rs
// ============================================================================
// Module: SQLite KV Store
// Description: KvStore implementation used for the L2/L3 cache tiers, the
//              RCR advisory load mirror, and durable run-state snapshots.
// Purpose: One durable, TTL-aware key/value backend behind a narrow trait.
// Dependencies: agentflow-core, rusqlite, tokio
// ============================================================================

//! ## Overview
//! Values are stored as raw bytes alongside an optional expiry timestamp.
//! Reads treat an expired row as absent and delete it lazily; there is no
//! background sweeper, matching the KV store's advisory-TTL contract (it
//! backs cache tiers and load mirrors, not anything safety-critical).

use std::sync::Arc;
use std::sync::Mutex;

use agentflow_core::CacheKey;
use agentflow_core::KvError;
use agentflow_core::KvStore;
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::connection;
use crate::errors::StoreError;
use crate::config::StoreConfig;

/// Current Unix time in milliseconds, used to evaluate TTL expiry.
fn now_millis() -> i64 {
    let duration = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Initializes the `kv_entries` table if it does not already exist.
fn initialize_schema(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            expires_at_ms INTEGER
        );",
    )?;
    Ok(())
}

/// `SQLite`-backed [`KvStore`].
pub struct SqliteKvStore {
    /// Shared connection guarded by a mutex; `rusqlite::Connection` is not
    /// `Sync`, and every async trait method runs its body on a blocking task.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Opens (or creates) a `SQLite` KV store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the database cannot be opened or its
    /// schema cannot be initialized.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let connection = connection::open(config)?;
        initialize_schema(&connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Runs a blocking closure against the connection on a blocking thread.
    async fn with_connection<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock().map_err(|_err| StoreError::Connection("kv store mutex poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, KvError> {
        let key = key.as_str().to_string();
        self.with_connection(move |connection| {
            let row: Option<(Vec<u8>, Option<i64>)> = connection
                .query_row("SELECT value, expires_at_ms FROM kv_entries WHERE key = ?1", params![key], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?;
            let Some((value, expires_at_ms)) = row else {
                return Ok(None);
            };
            if let Some(expires_at_ms) = expires_at_ms {
                if expires_at_ms <= now_millis() {
                    connection.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                    return Ok(None);
                }
            }
            Ok(Some(value))
        })
        .await
        .map_err(KvError::from)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<(), KvError> {
        let key = key.as_str().to_string();
        #[allow(clippy::cast_possible_wrap, reason = "ttl_ms values stay far below i64::MAX")]
        let expires_at_ms = ttl_ms.map(|ttl| now_millis() + ttl as i64);
        self.with_connection(move |connection| {
            connection.execute(
                "INSERT INTO kv_entries (key, value, expires_at_ms) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at_ms = excluded.expires_at_ms",
                params![key, value, expires_at_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(KvError::from)
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), KvError> {
        let key = key.as_str().to_string();
        self.with_connection(move |connection| {
            connection.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(KvError::from)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<CacheKey>, KvError> {
        let prefix = prefix.to_string();
        self.with_connection(move |connection| {
            let like_pattern = format!("{}%", escape_like(&prefix));
            let mut statement = connection.prepare("SELECT key FROM kv_entries WHERE key LIKE ?1 ESCAPE '\\'")?;
            let rows = statement.query_map(params![like_pattern], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(CacheKey::new(row?));
            }
            Ok(keys)
        })
        .await
        .map_err(KvError::from)
    }
}

/// Escapes `%`, `_`, and `\` so a raw prefix can be used safely in a `LIKE`
/// pattern.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use tempfile::tempdir;

    use super::*;

    fn store_at(dir: &tempfile::TempDir) -> SqliteKvStore {
        SqliteKvStore::open(&StoreConfig::at(dir.path().join("kv.sqlite3"))).unwrap()
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir);
        let key = CacheKey::new("plan:abc");
        store.set(&key, b"payload".to_vec(), None).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir);
        let key = CacheKey::new("step:xyz");
        store.set(&key, b"payload".to_vec(), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir);
        let key = CacheKey::new("missing");
        store.delete(&key).await.unwrap();
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn keys_with_prefix_finds_only_matching_keys() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir);
        store.set(&CacheKey::new("rcr:load:analyst"), b"1".to_vec(), None).await.unwrap();
        store.set(&CacheKey::new("rcr:load:synthesizer"), b"2".to_vec(), None).await.unwrap();
        store.set(&CacheKey::new("cache:l2:abc"), b"3".to_vec(), None).await.unwrap();
        let mut found: Vec<String> = store.keys_with_prefix("rcr:load:").await.unwrap().into_iter().map(|key| key.as_str().to_string()).collect();
        found.sort();
        assert_eq!(found, vec!["rcr:load:analyst".to_string(), "rcr:load:synthesizer".to_string()]);
    }

    #[tokio::test]
    async fn overwriting_a_key_replaces_its_ttl() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir);
        let key = CacheKey::new("k");
        store.set(&key, b"first".to_vec(), Some(0)).await.unwrap();
        store.set(&key, b"second".to_vec(), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get(&key).await.unwrap(), Some(b"second".to_vec()));
    }
}
