// agentflow-webhook/src/dead_letter.rs
// ============================================================================
// Module: Dead-Letter Notification
// Description: Dead-letter record shape and the operator-notification seam.
// Purpose: Record terminally failed deliveries and hand them to whatever
//          channel the host application wires up.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! ## Overview
//! `OperatorNotifier` is the dead-letter analogue of the teacher's `Sink`
//! trait (`decision-gate-broker::sink`): one seam, multiple backends. This
//! crate ships a `TracingNotifier` (always on, mirrors `sink::log`) and a
//! `ChannelNotifier` (mirrors `sink::channel`) for host applications that
//! want to pipe dead letters into their own queue.

use agentflow_core::DeliveryId;
use agentflow_core::Timestamp;
use agentflow_core::WebhookId;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

/// A delivery that exhausted its retries (or hit a terminal status) without
/// ever succeeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// Endpoint the delivery targeted.
    pub webhook_id: WebhookId,
    /// Delivery identifier shared across every attempt of this event.
    pub delivery_id: DeliveryId,
    /// Endpoint URL at the time of the final attempt.
    pub url: String,
    /// The event payload that could not be delivered.
    pub payload: serde_json::Value,
    /// Description of the failure that ended the retry loop.
    pub final_error: String,
    /// Timestamp the record was created.
    pub created_at: Timestamp,
}

/// A destination for dead-letter records.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    /// Hands `record` to the configured notification channel.
    async fn notify(&self, record: &DeadLetterRecord);
}

/// Notifier that logs the dead letter as a structured `tracing` event.
///
/// Always safe to use as a default: it never blocks and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl OperatorNotifier for TracingNotifier {
    async fn notify(&self, record: &DeadLetterRecord) {
        tracing::warn!(
            webhook_id = %record.webhook_id,
            delivery_id = %record.delivery_id,
            url = %record.url,
            final_error = %record.final_error,
            "webhook delivery dead-lettered"
        );
    }
}

/// Notifier that forwards dead letters over a `tokio::sync::mpsc` channel for
/// a host-owned consumer (paging, ticketing, a dashboard feed).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    /// Sender the dead letter is pushed onto.
    sender: Sender<DeadLetterRecord>,
}

impl ChannelNotifier {
    /// Builds a notifier over `sender`.
    #[must_use]
    pub const fn new(sender: Sender<DeadLetterRecord>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl OperatorNotifier for ChannelNotifier {
    async fn notify(&self, record: &DeadLetterRecord) {
        if let Err(TrySendError::Full(_) | TrySendError::Closed(_)) = self.sender.try_send(record.clone()) {
            tracing::warn!(
                webhook_id = %record.webhook_id,
                delivery_id = %record.delivery_id,
                "dead-letter channel unavailable, dropping notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn sample_record() -> DeadLetterRecord {
        DeadLetterRecord {
            webhook_id: WebhookId::new("wh-1"),
            delivery_id: DeliveryId::new("del-1"),
            url: "https://example.com/hook".to_string(),
            payload: serde_json::json!({"event": "run.completed"}),
            final_error: "http status 503".to_string(),
            created_at: Timestamp::from_millis(0),
        }
    }

    #[tokio::test]
    async fn tracing_notifier_never_panics() {
        TracingNotifier.notify(&sample_record()).await;
    }

    #[tokio::test]
    async fn channel_notifier_forwards_the_record() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let notifier = ChannelNotifier::new(tx);
        notifier.notify(&sample_record()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.webhook_id.as_str(), "wh-1");
    }
}
