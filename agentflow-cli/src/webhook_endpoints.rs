// agentflow-cli/src/webhook_endpoints.rs
// ============================================================================
// Module: Webhook Endpoint Store
// Description: Loads the static, per-tenant webhook endpoint list the
//              Finalize stage fans a run's completion event out to.
// Purpose: Give the Finalize stage a concrete endpoint list without taking
//          on tenant/endpoint provisioning (Non-goal).
// Dependencies: agentflow-core, serde, toml
// ============================================================================

//! ## Overview
//! Endpoint provisioning and billing are explicit non-goals; this module
//! only answers "what endpoints does this tenant have registered", read
//! once at startup from an optional TOML file (see DESIGN.md's Open
//! Question decision). A missing path yields an empty store rather than an
//! error, since the orchestrator tolerates a run with no webhook endpoints.

use std::collections::HashMap;
use std::path::Path;

use agentflow_core::RetryConfig;
use agentflow_core::TenantId;
use agentflow_core::WebhookEndpoint;
use agentflow_core::WebhookId;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the webhook endpoint file.
#[derive(Debug, Error)]
pub enum WebhookEndpointsError {
    /// The file could not be read.
    #[error("failed to read webhook endpoints file: {0}")]
    Io(#[from] std::io::Error),
    /// The file was not valid TOML matching [`WebhookEndpointsFile`].
    #[error("failed to parse webhook endpoints file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
struct WebhookEndpointsFile {
    #[serde(default)]
    endpoints: Vec<WebhookEndpointEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEndpointEntry {
    id: String,
    tenant_id: String,
    url: String,
    #[serde(default)]
    events: Vec<String>,
    secret: String,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_true")]
    verify_ssl: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    5_000
}

/// Per-tenant webhook endpoints, indexed by tenant id.
pub struct WebhookEndpointStore {
    by_tenant: HashMap<String, Vec<WebhookEndpoint>>,
}

impl WebhookEndpointStore {
    /// Loads endpoints from `path`, or returns an empty store when `path`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookEndpointsError`] when `path` is given but cannot be
    /// read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, WebhookEndpointsError> {
        let Some(path) = path else {
            return Ok(Self { by_tenant: HashMap::new() });
        };
        let raw = std::fs::read_to_string(path)?;
        let file: WebhookEndpointsFile = toml::from_str(&raw)?;
        let mut by_tenant: HashMap<String, Vec<WebhookEndpoint>> = HashMap::new();
        for entry in file.endpoints {
            let tenant_id = entry.tenant_id.clone();
            let endpoint = WebhookEndpoint {
                id: WebhookId::new(entry.id),
                tenant_id: TenantId::new(entry.tenant_id),
                url: entry.url,
                events: entry.events,
                secret: entry.secret,
                active: entry.active,
                timeout_ms: entry.timeout_ms,
                verify_ssl: entry.verify_ssl,
                retry_config: RetryConfig::default(),
                disabled_reason: None,
                disabled_at: None,
            };
            by_tenant.entry(tenant_id).or_default().push(endpoint);
        }
        Ok(Self { by_tenant })
    }

    /// Returns the active endpoints registered for `tenant_id`.
    #[must_use]
    pub fn for_tenant(&self, tenant_id: &str) -> Vec<WebhookEndpoint> {
        self.by_tenant.get(tenant_id).map(|endpoints| endpoints.iter().filter(|endpoint| endpoint.active).cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use std::io::Write as _;

    use super::*;

    #[test]
    fn absent_path_yields_an_empty_store() {
        let store = WebhookEndpointStore::load(None).unwrap();
        assert!(store.for_tenant("tenant-a").is_empty());
    }

    #[test]
    fn loads_and_filters_inactive_endpoints() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"
            [[endpoints]]
            id = "wh-1"
            tenant_id = "tenant-a"
            url = "https://example.com/hook"
            secret = "shh"

            [[endpoints]]
            id = "wh-2"
            tenant_id = "tenant-a"
            url = "https://example.com/disabled"
            secret = "shh"
            active = false
        "#)
        .unwrap();
        let store = WebhookEndpointStore::load(Some(file.path())).unwrap();
        let endpoints = store.for_tenant("tenant-a");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].id.as_str(), "wh-1");
        assert!(store.for_tenant("tenant-b").is_empty());
    }
}
