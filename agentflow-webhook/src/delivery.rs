// agentflow-webhook/src/delivery.rs
// ============================================================================
// Module: Delivery Engine
// Description: Dispatches an event to every active subscribed endpoint,
//              retrying with capped exponential backoff and recording
//              dead letters and auto-disable decisions.
// Purpose: The crate's one entry point for outbound webhook delivery.
// Dependencies: agentflow-core, agentflow-config, tokio
// ============================================================================

//! ## Overview
//! `WebhookDispatcher::dispatch` fans an event out to every endpoint
//! subscribed to it, signs and sends each attempt, retries per the
//! endpoint's own [`RetryConfig`], and on terminal failure records a
//! [`DeadLetterRecord`] and notifies the configured [`OperatorNotifier`].
//! Health accounting happens once per dispatch, not once per HTTP attempt.

use std::sync::Arc;

use agentflow_config::WebhookConfig;
use agentflow_core::Clock;
use agentflow_core::DeliveryId;
use agentflow_core::Prng;
use agentflow_core::WebhookDelivery;
use agentflow_core::WebhookEndpoint;
use agentflow_core::WebhookTransport;
use agentflow_core::hashing::hash_bytes;
use serde_json::Value;

use crate::dead_letter::DeadLetterRecord;
use crate::dead_letter::OperatorNotifier;
use crate::dead_letter::TracingNotifier;
use crate::health::HealthTracker;
use crate::retry::backoff_delay;
use crate::retry::is_terminal_status;
use crate::signing::build_headers;

/// The outcome of dispatching one event to one endpoint.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// One record per HTTP attempt made.
    pub attempts: Vec<WebhookDelivery>,
    /// Set when every attempt failed and the delivery was dead-lettered.
    pub dead_letter: Option<DeadLetterRecord>,
    /// Whether this dispatch caused the endpoint to be auto-disabled.
    pub disabled: bool,
}

/// Dispatches events to subscribed, active webhook endpoints.
pub struct WebhookDispatcher {
    /// Outbound HTTP boundary.
    transport: Arc<dyn WebhookTransport>,
    /// Dead-letter notification sink.
    notifier: Arc<dyn OperatorNotifier>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Seeded randomness for delivery ids and backoff jitter.
    prng: Arc<Prng>,
    /// Auto-disable thresholds.
    config: WebhookConfig,
    /// Rolling per-endpoint dispatch health.
    health: HealthTracker,
}

impl WebhookDispatcher {
    /// Builds a dispatcher that logs dead letters via `tracing`.
    #[must_use]
    pub fn new(transport: Arc<dyn WebhookTransport>, clock: Arc<dyn Clock>, prng: Arc<Prng>, config: WebhookConfig) -> Self {
        Self::with_notifier(transport, Arc::new(TracingNotifier), clock, prng, config)
    }

    /// Builds a dispatcher with a caller-supplied dead-letter notifier.
    #[must_use]
    pub fn with_notifier(transport: Arc<dyn WebhookTransport>, notifier: Arc<dyn OperatorNotifier>, clock: Arc<dyn Clock>, prng: Arc<Prng>, config: WebhookConfig) -> Self {
        Self { transport, notifier, clock, prng, config, health: HealthTracker::new() }
    }

    /// Dispatches `payload` for `event_type` to every active endpoint in
    /// `endpoints` subscribed to it, returning one outcome per endpoint
    /// dispatched to.
    pub async fn dispatch(&self, event_type: &str, payload: &Value, endpoints: &[WebhookEndpoint]) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for endpoint in endpoints {
            if !endpoint.active || !endpoint.events.iter().any(|event| event == event_type) {
                continue;
            }
            outcomes.push(self.deliver_one(endpoint, event_type, payload).await);
        }
        outcomes
    }

    /// Attempts delivery to a single endpoint, retrying per its
    /// [`RetryConfig`](agentflow_core::RetryConfig).
    async fn deliver_one(&self, endpoint: &WebhookEndpoint, event_type: &str, payload: &Value) -> DispatchOutcome {
        let delivery_id = DeliveryId::new(self.prng.uuid_v4());
        let raw_body = serde_json::to_vec(payload).unwrap_or_default();
        let payload_digest = hash_bytes(&raw_body);

        let mut attempts = Vec::new();
        let mut final_error = String::new();
        let mut succeeded = false;

        for attempt in 1..=endpoint.retry_config.max_attempts {
            let started = self.clock.now();
            let headers = build_headers(&endpoint.secret, &raw_body, delivery_id.as_str(), started.as_millis());
            let outcome = self.transport.post(&endpoint.url, &headers, raw_body.clone(), endpoint.timeout_ms).await;
            let completed = self.clock.now();
            #[allow(clippy::cast_possible_truncation, reason = "run durations stay far below u64::MAX milliseconds")]
            let duration_ms = completed.saturating_duration_since(started).as_millis() as u64;

            let (status_code, error, is_success, terminal) = match &outcome {
                Ok(response) if (200..300).contains(&response.status_code) => (Some(response.status_code), None, true, false),
                Ok(response) => {
                    let message = format!("http status {}", response.status_code);
                    (Some(response.status_code), Some(message), false, is_terminal_status(response.status_code))
                }
                Err(err) => (None, Some(err.to_string()), false, false),
            };

            attempts.push(WebhookDelivery {
                webhook_id: endpoint.id.clone(),
                delivery_id: delivery_id.clone(),
                event_type: event_type.to_string(),
                payload_digest: payload_digest.clone(),
                attempt,
                status_code,
                duration_ms,
                success: is_success,
                error: error.clone(),
                created_at: started,
            });

            if is_success {
                succeeded = true;
                break;
            }
            final_error = error.unwrap_or_default();
            if terminal || attempt == endpoint.retry_config.max_attempts {
                break;
            }
            let delay = backoff_delay(attempt, endpoint.retry_config.base_backoff_ms, endpoint.retry_config.max_backoff_ms, &self.prng);
            tokio::time::sleep(delay).await;
        }

        if succeeded {
            self.health.record(&endpoint.id, self.clock.now(), false, self.config.auto_disable_min_dead_letters, self.config.auto_disable_ratio).await;
            return DispatchOutcome { attempts, dead_letter: None, disabled: false };
        }

        let record = DeadLetterRecord {
            webhook_id: endpoint.id.clone(),
            delivery_id,
            url: endpoint.url.clone(),
            payload: payload.clone(),
            final_error,
            created_at: self.clock.now(),
        };
        self.notifier.notify(&record).await;
        let disabled = self.health.record(&endpoint.id, self.clock.now(), true, self.config.auto_disable_min_dead_letters, self.config.auto_disable_ratio).await;
        DispatchOutcome { attempts, dead_letter: Some(record), disabled }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(
        clippy::unwrap_used,
        clippy::cast_possible_truncation,
        reason = "Test-only panic-based assertions and a call-counter index cast are permitted."
    )]

    use agentflow_core::FixedClock;
    use agentflow_core::RetryConfig;
    use agentflow_core::TenantId;
    use agentflow_core::Timestamp;
    use agentflow_core::TransportError;
    use agentflow_core::TransportResponse;
    use agentflow_core::WebhookId;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use super::*;

    struct ScriptedTransport {
        /// Status codes returned on successive calls, repeating the last.
        statuses: Vec<u16>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post(&self, _url: &str, _headers: &[(String, String)], _body: Vec<u8>, _timeout_ms: u64) -> Result<TransportResponse, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let status = *self.statuses.get(index).unwrap_or_else(|| self.statuses.last().unwrap());
            Ok(TransportResponse { status_code: status, body: Vec::new() })
        }
    }

    fn endpoint(max_attempts: u32) -> WebhookEndpoint {
        WebhookEndpoint {
            id: WebhookId::new("wh-1"),
            tenant_id: TenantId::new("tenant-a"),
            url: "https://example.com/hook".to_string(),
            events: vec!["run.completed".to_string()],
            secret: "top-secret".to_string(),
            active: true,
            timeout_ms: 5_000,
            verify_ssl: true,
            retry_config: RetryConfig { max_attempts, base_backoff_ms: 1, max_backoff_ms: 2 },
            disabled_reason: None,
            disabled_at: None,
        }
    }

    fn dispatcher(statuses: Vec<u16>) -> WebhookDispatcher {
        let transport = Arc::new(ScriptedTransport { statuses, calls: AtomicU32::new(0) });
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let prng = Arc::new(Prng::from_seed(1));
        WebhookDispatcher::new(transport, clock, prng, WebhookConfig::default())
    }

    #[tokio::test]
    async fn a_2xx_response_succeeds_on_first_attempt() {
        let dispatcher = dispatcher(vec![200]);
        let endpoints = vec![endpoint(5)];
        let outcomes = dispatcher.dispatch("run.completed", &serde_json::json!({}), &endpoints).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempts.len(), 1);
        assert!(outcomes[0].dead_letter.is_none());
    }

    #[tokio::test]
    async fn exhausting_retries_dead_letters_the_delivery() {
        let dispatcher = dispatcher(vec![503]);
        let endpoints = vec![endpoint(3)];
        let outcomes = dispatcher.dispatch("run.completed", &serde_json::json!({}), &endpoints).await;
        assert_eq!(outcomes[0].attempts.len(), 3);
        assert!(outcomes[0].dead_letter.is_some());
    }

    #[tokio::test]
    async fn a_terminal_status_stops_retrying_immediately() {
        let dispatcher = dispatcher(vec![410]);
        let endpoints = vec![endpoint(5)];
        let outcomes = dispatcher.dispatch("run.completed", &serde_json::json!({}), &endpoints).await;
        assert_eq!(outcomes[0].attempts.len(), 1);
        assert!(outcomes[0].dead_letter.is_some());
    }

    #[tokio::test]
    async fn an_inactive_endpoint_is_skipped() {
        let dispatcher = dispatcher(vec![200]);
        let mut inactive = endpoint(5);
        inactive.active = false;
        let outcomes = dispatcher.dispatch("run.completed", &serde_json::json!({}), &[inactive]).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn an_unsubscribed_event_type_is_skipped() {
        let dispatcher = dispatcher(vec![200]);
        let endpoints = vec![endpoint(5)];
        let outcomes = dispatcher.dispatch("run.failed", &serde_json::json!({}), &endpoints).await;
        assert!(outcomes.is_empty());
    }
}
