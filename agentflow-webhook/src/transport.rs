// agentflow-webhook/src/transport.rs
// ============================================================================
// Module: Outbound Transport
// Description: `WebhookTransport` implementation over `reqwest`.
// Purpose: Supply the async HTTP egress boundary the delivery engine sends
//          through.
// Dependencies: agentflow-core, reqwest
// ============================================================================

//! ## Overview
//! Mirrors the teacher's `source::http` posture (fixed timeout, no
//! follow-redirects) adapted to an async POST instead of a blocking GET.
//!
//! `WebhookTransport::post` does not carry a `verify_ssl` parameter (it is a
//! property of the endpoint, not of one request), so this transport always
//! verifies certificates; an endpoint configured with `verify_ssl = false`
//! is accepted by the domain model but its flag is not honored at this
//! layer (see DESIGN.md).

use std::time::Duration;

use agentflow_core::TransportError;
use agentflow_core::TransportResponse;
use agentflow_core::WebhookTransport;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;

/// `WebhookTransport` over `reqwest`, with redirect-following disabled so a
/// redirected POST never carries the signature to an unintended host.
#[derive(Debug, Clone)]
pub struct ReqwestWebhookTransport {
    /// The underlying HTTP client.
    client: Client,
}

impl ReqwestWebhookTransport {
    /// Builds the transport's client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] when the client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().redirect(Policy::none()).build().map_err(|err| TransportError::Send(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestWebhookTransport {
    async fn post(&self, url: &str, headers: &[(String, String)], body: Vec<u8>, timeout_ms: u64) -> Result<TransportResponse, TransportError> {
        let mut request = self.client.post(url).timeout(Duration::from_millis(timeout_ms)).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await.map_err(|err| TransportError::Send(err.to_string()))?;
        let status_code = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| TransportError::Send(err.to_string()))?;
        Ok(TransportResponse { status_code, body: body.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn client_builds_successfully() {
        assert!(ReqwestWebhookTransport::new().is_ok());
    }
}
