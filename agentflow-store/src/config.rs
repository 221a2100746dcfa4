// agentflow-store/src/config.rs
// ============================================================================
// Module: Store Configuration
// Description: Connection path and SQLite pragma settings for the backend.
// Purpose: Keep journal/sync-mode tuning out of the connection-opening code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The persistence engine is deliberately unprescribed (design note, §9): this
//! crate is one concrete backend, so its configuration is crate-local rather
//! than folded into the shared orchestrator configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Default busy timeout applied to every connection.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log, recommended for concurrent readers.
    #[default]
    Wal,
    /// Legacy rollback-journal mode.
    Delete,
}

impl JournalMode {
    /// Returns the pragma value `SQLite` expects.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full `fsync` on every commit, safest.
    #[default]
    Full,
    /// Relaxed durability, faster under WAL.
    Normal,
}

impl SyncMode {
    /// Returns the pragma value `SQLite` expects.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Connection and durability settings for [`SqliteKvStore`](crate::kv::SqliteKvStore)
/// and [`SqliteTenancyStore`](crate::tenancy::SqliteTenancyStore).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds before a locked write gives up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Synchronous mode.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    /// Builds a config pointing at `path` with default pragmas.
    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { path, busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS, journal_mode: JournalMode::default(), sync_mode: SyncMode::default() }
    }
}
