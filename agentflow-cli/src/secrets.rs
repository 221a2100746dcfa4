// agentflow-cli/src/secrets.rs
// ============================================================================
// Module: Environment Secret Source
// Description: Resolves webhook signing secrets from environment variables.
// Purpose: Give the inbound HMAC validator a concrete SecretSource without
//          pulling in a secrets-manager dependency (Non-goal).
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! A named secret `source` resolves to the environment variable
//! `AGENTFLOW_SECRET_<SOURCE>`, with `source` upper-cased and every
//! non-alphanumeric character replaced by `_` — the same normalization
//! `agentflow_config`'s own env-override keys already use.

use agentflow_core::SecretError;
use agentflow_core::SecretSource;
use async_trait::async_trait;

/// [`SecretSource`] backed by environment variables.
pub struct EnvSecretSource;

impl EnvSecretSource {
    /// Builds the source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        let var_name = format!("AGENTFLOW_SECRET_{}", normalize(name));
        std::env::var(&var_name).map_err(|_err| SecretError::NotFound(name.to_string()))
    }
}

/// Upper-cases `name` and replaces every non-alphanumeric character with
/// `_`, producing a valid environment variable suffix.
fn normalize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]
    #![allow(unsafe_code, reason = "Test mutates process env to exercise lookup.")]

    use super::*;

    #[tokio::test]
    async fn resolves_a_registered_secret() {
        // SAFETY: this test owns the variable it sets and clears it below.
        unsafe {
            std::env::set_var("AGENTFLOW_SECRET_WEBHOOKS_STRIPE", "top-secret");
        }
        let source = EnvSecretSource::new();
        let secret = source.get_secret("webhooks:stripe").await.unwrap();
        assert_eq!(secret, "top-secret");
        // SAFETY: cleans up the variable set above.
        unsafe {
            std::env::remove_var("AGENTFLOW_SECRET_WEBHOOKS_STRIPE");
        }
    }

    #[tokio::test]
    async fn reports_an_unregistered_secret_as_not_found() {
        let source = EnvSecretSource::new();
        let err = source.get_secret("does-not-exist-xyz").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
    }
}
