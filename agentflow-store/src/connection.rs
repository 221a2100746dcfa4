// agentflow-store/src/connection.rs
// ============================================================================
// Module: Connection Setup
// Description: Opens a SQLite connection with durable pragmas applied.
// Purpose: Shared by the KV store and the tenancy store so both agree on
//          journal mode, sync mode, and busy timeout.
// Dependencies: rusqlite
// ============================================================================

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::config::StoreConfig;
use crate::errors::StoreError;

/// Maximum length of a single path component accepted for the database file.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length accepted for the database file.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Opens a connection at `config.path`, creating parent directories and
/// applying durability pragmas.
///
/// # Errors
///
/// Returns [`StoreError::Connection`] when the path is invalid, its parent
/// directory cannot be created, or the connection cannot be opened.
pub fn open(config: &StoreConfig) -> Result<Connection, StoreError> {
    validate_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(|err| StoreError::Connection(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Creates the database file's parent directory if it does not exist.
fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Connection("store path has no parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| StoreError::Connection(err.to_string()))
}

/// Rejects paths long enough to be a resource-exhaustion or traversal smell.
fn validate_path(path: &Path) -> Result<(), StoreError> {
    let as_string = path.display().to_string();
    if as_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(StoreError::Connection("store path exceeds the length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(StoreError::Connection("store path has an overlong component".to_string()));
        }
    }
    Ok(())
}

/// Applies the configured journal mode, sync mode, and busy timeout.
fn apply_pragmas(connection: &Connection, config: &StoreConfig) -> Result<(), StoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| StoreError::Connection(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| StoreError::Connection(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| StoreError::Connection(err.to_string()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(|err| StoreError::Connection(err.to_string()))
}
