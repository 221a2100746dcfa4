// agentflow-config/src/lib.rs
// ============================================================================
// Crate: agentflow-config
// Description: Typed configuration record for the orchestrator.
// Purpose: One place to load, override, validate, and hash the
//          configuration every other crate runs under.
// Dependencies: agentflow-core, serde, toml, thiserror
// ============================================================================

//! # agentflow-config
//!
//! Loads `OrchestratorConfig` from an optional TOML file, applies the
//! enumerated environment variable overrides, and validates the result
//! before anything downstream sees it.

pub mod config;

pub use config::CONFIG_ENV_VAR;
pub use config::CacheConfig;
pub use config::CircuitBreakerConfig;
pub use config::ComplexityWeights;
pub use config::ConfigError;
pub use config::HmacConfig;
pub use config::LagConfig;
pub use config::MAX_CONFIG_FILE_SIZE;
pub use config::OrchestratorConfig;
pub use config::RateLimitConfig;
pub use config::ServerConfig;
pub use config::WebhookConfig;
