// agentflow-cli/src/role_adapter.rs
// ============================================================================
// Module: HTTP Role Adapter
// Description: RoleAdapter implementation that bridges to an external
//              role-execution backend over HTTP.
// Purpose: Supply a concrete RoleAdapter without binding the orchestrator to
//          a specific LLM or embedding provider (Non-goal).
// Dependencies: agentflow-core, reqwest
// ============================================================================

//! ## Overview
//! Mirrors `agentflow_webhook::transport::ReqwestWebhookTransport`'s posture
//! (a plain `reqwest::Client`, an explicit per-call timeout) adapted to a
//! JSON request/response body instead of a raw byte payload. Which backend
//! answers `POST {endpoint}` — a model server, a tool runner, a test
//! double — is deliberately out of this crate's concern.

use std::time::Duration;
use std::time::Instant;

use agentflow_core::RoleAdapter;
use agentflow_core::RoleAdapterError;
use agentflow_core::RoleRequest;
use agentflow_core::RoleResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;

/// Timeout applied to the underlying HTTP call. The orchestrator itself
/// enforces the authoritative per-step deadline (`step_timeout_ms`); this is
/// a defensive fallback so a hung connection cannot outlive the process.
const DEFAULT_TIMEOUT_S: u64 = 60;

/// [`RoleAdapter`] that POSTs a step's request to a configured HTTP
/// endpoint and parses the role's answer back out of the JSON response.
pub struct HttpRoleAdapter {
    client: Client,
    endpoint: String,
}

impl HttpRoleAdapter {
    /// Builds an adapter that POSTs to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RoleAdapterError::CallFailed`] when the HTTP client fails
    /// to build.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RoleAdapterError> {
        let client = Client::builder().build().map_err(|err| RoleAdapterError::CallFailed(err.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

/// Wire body sent to the role-execution backend.
#[derive(Serialize)]
struct ExecuteRequestBody<'a> {
    role: &'a str,
    input: &'a str,
    token_budget: u64,
    temperature: f64,
}

/// Wire body expected back from the role-execution backend.
#[derive(Deserialize)]
struct ExecuteResponseBody {
    output: String,
    tokens_used: u64,
    confidence: f64,
}

#[async_trait]
impl RoleAdapter for HttpRoleAdapter {
    async fn execute(&self, request: RoleRequest) -> Result<RoleResponse, RoleAdapterError> {
        let body = ExecuteRequestBody { role: request.role.as_str(), input: &request.input, token_budget: request.token_budget, temperature: request.temperature };
        let started = Instant::now();

        let response = self.client.post(&self.endpoint).timeout(Duration::from_secs(DEFAULT_TIMEOUT_S)).json(&body).send().await;
        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Err(RoleAdapterError::TimedOut { elapsed_ms });
            }
            Err(err) => return Err(RoleAdapterError::CallFailed(err.to_string())),
        };

        if !response.status().is_success() {
            return Err(RoleAdapterError::CallFailed(format!("role backend returned HTTP {}", response.status())));
        }

        let parsed: ExecuteResponseBody = response.json().await.map_err(|err| RoleAdapterError::CallFailed(err.to_string()))?;
        Ok(RoleResponse { output: parsed.output, tokens_used: parsed.tokens_used, confidence: parsed.confidence })
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn builds_successfully() {
        assert!(HttpRoleAdapter::new("http://127.0.0.1:9000/v1/roles/execute").is_ok());
    }
}
