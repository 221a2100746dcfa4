// agentflow-webhook/src/lib.rs
// ============================================================================
// Crate: agentflow-webhook
// Description: Outbound webhook delivery (signing, retry, dead-letter,
//              auto-disable) and the inbound HMAC validator.
// Purpose: Implement the Webhook Delivery and HMAC Validator components.
// Dependencies: agentflow-core, agentflow-config, hmac, sha1, sha2, subtle,
//               reqwest, tokio
// ============================================================================

//! # agentflow-webhook
//!
//! `WebhookDispatcher::dispatch` is the outbound entry point: it signs,
//! sends, retries, and (on exhaustion) dead-letters and auto-disables.
//! `HmacValidator::validate` is the inbound entry point used by the HTTP
//! ingress to authenticate a received request before acting on it.

pub mod dead_letter;
pub mod delivery;
pub mod errors;
pub mod health;
pub mod retry;
pub mod signing;
pub mod transport;
pub mod validator;

pub use dead_letter::ChannelNotifier;
pub use dead_letter::DeadLetterRecord;
pub use dead_letter::OperatorNotifier;
pub use dead_letter::TracingNotifier;
pub use delivery::DispatchOutcome;
pub use delivery::WebhookDispatcher;
pub use errors::DeliveryError;
pub use errors::ValidationError;
pub use health::HealthTracker;
pub use retry::backoff_delay;
pub use retry::is_terminal_status;
pub use signing::build_headers;
pub use signing::sign;
pub use transport::ReqwestWebhookTransport;
pub use validator::HmacValidator;
