// agentflow-store/src/lib.rs
// ============================================================================
// Crate: agentflow-store
// Description: SQLite-backed KvStore and TenancyStore implementations.
// Purpose: The durable backend the cache tiers, advisory load mirror, and
//          tenant quota admission check run against.
// Dependencies: agentflow-core, rusqlite, tokio
// ============================================================================

//! # agentflow-store
//!
//! The persistence engine is deliberately unprescribed by the orchestration
//! contract; this crate is one concrete, production-shaped choice: `SQLite`
//! with WAL journaling, consulted through the narrow [`agentflow_core::KvStore`]
//! and [`agentflow_core::TenancyStore`] traits so it can be swapped for a
//! remote backend without touching a caller.

pub mod config;
pub mod connection;
pub mod errors;
pub mod kv;
pub mod tenancy;

pub use config::JournalMode;
pub use config::StoreConfig;
pub use config::SyncMode;
pub use errors::StoreError;
pub use kv::SqliteKvStore;
pub use tenancy::SqliteTenancyStore;
