// agentflow-config/src/config.rs
// ============================================================================
// Module: Orchestrator Configuration
// Description: Configuration loading, environment overrides, and validation.
// Purpose: Provide one typed record for every tunable enumerated in the
//          external interfaces contract, loaded from TOML with strict
//          fail-closed validation.
// Dependencies: agentflow-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration loads from an optional TOML file, then a fixed set of
//! environment variables are applied on top (matching the enumerated
//! configuration keys), then the whole record is validated. A config that
//! fails validation is never partially applied: `load` either returns a
//! fully valid `OrchestratorConfig` or an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use agentflow_core::hashing::HashDigest;
use agentflow_core::hashing::hash_canonical_json;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to override the config file path.
pub const CONFIG_ENV_VAR: &str = "AGENTFLOW_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: OrchestratorConfig
// ============================================================================

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Deterministic seed for the PRNG, threaded through jitter, tie-break,
    /// and id allocation. Overridden by `SEED`.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Sampling temperature, clamped to `<= 0.2` at preflight. Overridden by
    /// `TEMPERATURE`.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// LAG engine configuration.
    #[serde(default)]
    pub lag: LagConfig,
    /// Tiered cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Rate limiter configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Webhook delivery configuration.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Inbound HMAC validation configuration.
    #[serde(default)]
    pub hmac: HmacConfig,
    /// HTTP ingress server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            temperature: default_temperature(),
            lag: LagConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            webhook: WebhookConfig::default(),
            hmac: HmacConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads configuration from `path` (or the default resolution rules
    /// when `None`), applies environment overrides, and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// environment override is malformed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path) {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Invalid`] when it exceeds the size limit, or
    /// [`ConfigError::Parse`] when it is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies the enumerated environment variable overrides in place.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        apply_parsed(&mut self.seed, "SEED")?;
        apply_parsed(&mut self.temperature, "TEMPERATURE")?;
        apply_parsed(&mut self.lag.max_depth, "MAX_DEPTH")?;
        apply_parsed(&mut self.lag.max_sub_questions, "MAX_SUB_QUESTIONS")?;
        apply_parsed(&mut self.cache.l1_max_items, "CACHE_L1_MAX_ITEMS")?;
        apply_parsed(&mut self.cache.l1_max_mb, "CACHE_L1_MAX_MB")?;
        apply_parsed(&mut self.rate_limit.rpm, "RATE_LIMIT_RPM")?;
        apply_parsed(&mut self.rate_limit.burst, "RATE_LIMIT_BURST")?;
        apply_parsed(&mut self.webhook.max_attempts, "WEBHOOK_MAX_ATTEMPTS")?;
        apply_parsed(&mut self.webhook.timeout_s, "WEBHOOK_TIMEOUT_S")?;
        apply_parsed(&mut self.hmac.max_skew_s, "HMAC_MAX_SKEW_S")?;
        apply_parsed(&mut self.circuit_breaker.failure_threshold, "CIRCUIT_FAILURE_THRESHOLD")?;
        apply_parsed(&mut self.circuit_breaker.minimum_requests, "CIRCUIT_MIN_REQUESTS")?;
        apply_parsed(&mut self.circuit_breaker.recovery_timeout_s, "CIRCUIT_RECOVERY_S")?;
        Ok(())
    }

    /// Validates every sub-configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature > 0.2 || self.temperature < 0.0 {
            return Err(ConfigError::Invalid("temperature must be in [0.0, 0.2]".to_string()));
        }
        self.lag.validate()?;
        self.cache.validate()?;
        self.rate_limit.validate()?;
        self.circuit_breaker.validate()?;
        self.webhook.validate()?;
        self.hmac.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Returns a stable hash of the canonical JSON form of this
    /// configuration, recorded as `Run::config_snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be canonicalized, which
    /// indicates a serialization bug rather than bad input.
    pub fn snapshot_hash(&self) -> Result<HashDigest, agentflow_core::hashing::HashError> {
        hash_canonical_json(self)
    }
}

const fn default_seed() -> u64 {
    42
}

const fn default_temperature() -> f64 {
    0.0
}

// ============================================================================
// SECTION: LagConfig
// ============================================================================

/// Weights applied to the three cognitive-load components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplexityWeights {
    /// Weight for the semantic-scope component.
    pub semantic_scope: f64,
    /// Weight for the reasoning-depth component.
    pub reasoning_depth: f64,
    /// Weight for the ambiguity component.
    pub ambiguity: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            semantic_scope: 0.3,
            reasoning_depth: 0.4,
            ambiguity: 0.3,
        }
    }
}

/// LAG engine configuration (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagConfig {
    /// Maximum decomposition depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Maximum number of sub-questions in a plan.
    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: u32,
    /// Cognitive-load threshold above which decomposition is attempted.
    #[serde(default = "default_cognitive_threshold")]
    pub cognitive_threshold: f64,
    /// Weights for the cognitive-load components.
    #[serde(default)]
    pub complexity_weights: ComplexityWeights,
    /// Minimum confidence for a step to avoid a `ConfidenceThreshold`
    /// terminator.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Maximum retries per step.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-run timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum query length, in characters, before decomposition rejects
    /// the input outright.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_sub_questions: default_max_sub_questions(),
            cognitive_threshold: default_cognitive_threshold(),
            complexity_weights: ComplexityWeights::default(),
            confidence_threshold: default_confidence_threshold(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            max_length: default_max_length(),
        }
    }
}

impl LagConfig {
    /// Validates the LAG configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range or the
    /// complexity weights do not sum to `1.0` within tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("lag.max_depth must be >= 1".to_string()));
        }
        if self.max_sub_questions == 0 {
            return Err(ConfigError::Invalid("lag.max_sub_questions must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.cognitive_threshold) {
            return Err(ConfigError::Invalid("lag.cognitive_threshold must be in [0, 1]".to_string()));
        }
        let sum = self.complexity_weights.semantic_scope
            + self.complexity_weights.reasoning_depth
            + self.complexity_weights.ambiguity;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid("lag.complexity_weights must sum to 1.0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid("lag.confidence_threshold must be in [0, 1]".to_string()));
        }
        if self.max_length == 0 {
            return Err(ConfigError::Invalid("lag.max_length must be >= 1".to_string()));
        }
        Ok(())
    }
}

const fn default_max_length() -> usize {
    4_000
}

const fn default_max_depth() -> u32 {
    5
}

const fn default_max_sub_questions() -> u32 {
    9
}

const fn default_cognitive_threshold() -> f64 {
    0.8
}

const fn default_confidence_threshold() -> f64 {
    0.75
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_timeout_ms() -> u64 {
    30_000
}

// ============================================================================
// SECTION: CacheConfig
// ============================================================================

/// Tiered cache configuration (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum L1 entry count.
    #[serde(default = "default_l1_max_items")]
    pub l1_max_items: usize,
    /// Maximum L1 total size, in megabytes.
    #[serde(default = "default_l1_max_mb")]
    pub l1_max_mb: usize,
    /// Default time-to-live for a fresh cache entry, in seconds.
    #[serde(default = "default_base_ttl_s")]
    pub base_ttl_s: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_items: default_l1_max_items(),
            l1_max_mb: default_l1_max_mb(),
            base_ttl_s: default_base_ttl_s(),
        }
    }
}

impl CacheConfig {
    /// Validates the cache configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.l1_max_items == 0 {
            return Err(ConfigError::Invalid("cache.l1_max_items must be >= 1".to_string()));
        }
        if self.l1_max_mb == 0 {
            return Err(ConfigError::Invalid("cache.l1_max_mb must be >= 1".to_string()));
        }
        Ok(())
    }
}

const fn default_l1_max_items() -> usize {
    1000
}

const fn default_l1_max_mb() -> usize {
    128
}

const fn default_base_ttl_s() -> u64 {
    300
}

// ============================================================================
// SECTION: RateLimitConfig
// ============================================================================

/// Rate limiter configuration (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per minute.
    #[serde(default = "default_rpm")]
    pub rpm: u32,
    /// Burst size for token/leaky bucket algorithms.
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Violation count after which a client is blocked.
    #[serde(default = "default_max_violations")]
    pub max_violations: u32,
    /// Block duration applied after `max_violations`, in seconds.
    #[serde(default = "default_block_duration_s")]
    pub block_duration_s: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rpm: default_rpm(),
            burst: default_burst(),
            max_violations: default_max_violations(),
            block_duration_s: default_block_duration_s(),
        }
    }
}

impl RateLimitConfig {
    /// Validates the rate limiter configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpm == 0 {
            return Err(ConfigError::Invalid("rate_limit.rpm must be >= 1".to_string()));
        }
        if self.burst == 0 {
            return Err(ConfigError::Invalid("rate_limit.burst must be >= 1".to_string()));
        }
        Ok(())
    }
}

const fn default_rpm() -> u32 {
    100
}

const fn default_burst() -> u32 {
    20
}

const fn default_max_violations() -> u32 {
    10
}

const fn default_block_duration_s() -> u64 {
    300
}

// ============================================================================
// SECTION: CircuitBreakerConfig
// ============================================================================

/// Circuit breaker configuration (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure fraction, in `[0, 1]`, above which the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    /// Minimum requests observed before the failure fraction is evaluated.
    #[serde(default = "default_minimum_requests")]
    pub minimum_requests: u32,
    /// Seconds the breaker stays open before probing.
    #[serde(default = "default_recovery_timeout_s")]
    pub recovery_timeout_s: u64,
    /// Calls admitted while half-open before deciding to close or reopen.
    #[serde(default = "default_half_open_probe_count")]
    pub half_open_probe_count: u32,
    /// Consecutive half-open successes required to close.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            minimum_requests: default_minimum_requests(),
            recovery_timeout_s: default_recovery_timeout_s(),
            half_open_probe_count: default_half_open_probe_count(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Validates the circuit breaker configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(ConfigError::Invalid("circuit_breaker.failure_threshold must be in [0, 1]".to_string()));
        }
        if self.minimum_requests == 0 {
            return Err(ConfigError::Invalid("circuit_breaker.minimum_requests must be >= 1".to_string()));
        }
        if self.half_open_probe_count == 0 {
            return Err(ConfigError::Invalid("circuit_breaker.half_open_probe_count must be >= 1".to_string()));
        }
        Ok(())
    }
}

const fn default_failure_threshold() -> f64 {
    0.5
}

const fn default_minimum_requests() -> u32 {
    20
}

const fn default_recovery_timeout_s() -> u64 {
    300
}

const fn default_half_open_probe_count() -> u32 {
    5
}

const fn default_success_threshold() -> u32 {
    3
}

// ============================================================================
// SECTION: WebhookConfig
// ============================================================================

/// Webhook delivery configuration (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Maximum delivery attempts per event.
    #[serde(default = "default_webhook_max_attempts")]
    pub max_attempts: u32,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_webhook_timeout_s")]
    pub timeout_s: u64,
    /// Base backoff, in milliseconds.
    #[serde(default = "default_webhook_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Backoff cap, in milliseconds.
    #[serde(default = "default_webhook_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Minimum dead-letter count before auto-disable is considered.
    #[serde(default = "default_auto_disable_min_dead_letters")]
    pub auto_disable_min_dead_letters: u32,
    /// Dead-letter ratio above which an endpoint is auto-disabled.
    #[serde(default = "default_auto_disable_ratio")]
    pub auto_disable_ratio: f64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_webhook_max_attempts(),
            timeout_s: default_webhook_timeout_s(),
            base_backoff_ms: default_webhook_base_backoff_ms(),
            max_backoff_ms: default_webhook_max_backoff_ms(),
            auto_disable_min_dead_letters: default_auto_disable_min_dead_letters(),
            auto_disable_ratio: default_auto_disable_ratio(),
        }
    }
}

impl WebhookConfig {
    /// Validates the webhook configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("webhook.max_attempts must be >= 1".to_string()));
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid("webhook.base_backoff_ms must be <= max_backoff_ms".to_string()));
        }
        if !(0.0..=1.0).contains(&self.auto_disable_ratio) {
            return Err(ConfigError::Invalid("webhook.auto_disable_ratio must be in [0, 1]".to_string()));
        }
        Ok(())
    }
}

const fn default_webhook_max_attempts() -> u32 {
    5
}

const fn default_webhook_timeout_s() -> u64 {
    30
}

const fn default_webhook_base_backoff_ms() -> u64 {
    1_000
}

const fn default_webhook_max_backoff_ms() -> u64 {
    60_000
}

const fn default_auto_disable_min_dead_letters() -> u32 {
    10
}

const fn default_auto_disable_ratio() -> f64 {
    0.8
}

// ============================================================================
// SECTION: HmacConfig
// ============================================================================

/// Inbound HMAC validation configuration (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmacConfig {
    /// Maximum allowed clock skew between `X-Timestamp` and now, in seconds.
    #[serde(default = "default_max_skew_s")]
    pub max_skew_s: u64,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            max_skew_s: default_max_skew_s(),
        }
    }
}

impl HmacConfig {
    /// Validates the HMAC configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_skew_s` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_skew_s == 0 {
            return Err(ConfigError::Invalid("hmac.max_skew_s must be >= 1".to_string()));
        }
        Ok(())
    }
}

const fn default_max_skew_s() -> u64 {
    300
}

// ============================================================================
// SECTION: ServerConfig
// ============================================================================

/// HTTP ingress server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP ingress server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Root directory under which run artifact directories are created.
    #[serde(default = "default_artifacts_root")]
    pub artifacts_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            artifacts_root: default_artifacts_root(),
        }
    }
}

impl ServerConfig {
    /// Validates the server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind_addr` does not parse as a
    /// socket address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("server.bind_addr is not a valid socket address: {}", self.bind_addr)))?;
        if self.artifacts_root.trim().is_empty() {
            return Err(ConfigError::Invalid("server.artifacts_root must be non-empty".to_string()));
        }
        Ok(())
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_artifacts_root() -> String {
    "runs".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the explicit argument or `AGENTFLOW_CONFIG`,
/// returning `None` when neither is set (callers then use built-in defaults).
fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path.to_path_buf());
    }
    env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

/// Applies an environment override to `field` if `var` is set, parsing it
/// with `FromStr`.
fn apply_parsed<T: std::str::FromStr>(field: &mut T, var: &str) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(var) {
        let parsed = raw.parse::<T>().map_err(|_| ConfigError::Invalid(format!("{var} is not a valid value")))?;
        *field = parsed;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]
    #![allow(unsafe_code, reason = "Test mutates process env to exercise override precedence.")]

    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        OrchestratorConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_temperature_above_cap() {
        let mut config = OrchestratorConfig::default();
        config.temperature = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_complexity_weights_not_summing_to_one() {
        let mut config = OrchestratorConfig::default();
        config.lag.complexity_weights.ambiguity = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_and_overrides_from_env_vars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 7").unwrap();
        writeln!(file, "[rate_limit]").unwrap();
        writeln!(file, "rpm = 50").unwrap();
        // SAFETY: no other test in this process reads `RATE_LIMIT_BURST`.
        unsafe {
            env::set_var("RATE_LIMIT_BURST", "99");
        }
        let config = OrchestratorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.rate_limit.rpm, 50);
        assert_eq!(config.rate_limit.burst, 99);
        // SAFETY: cleans up the variable set above.
        unsafe {
            env::remove_var("RATE_LIMIT_BURST");
        }
    }

    #[test]
    fn snapshot_hash_is_stable_for_identical_config() {
        let a = OrchestratorConfig::default().snapshot_hash().unwrap();
        let b = OrchestratorConfig::default().snapshot_hash().unwrap();
        assert_eq!(a, b);
    }
}
