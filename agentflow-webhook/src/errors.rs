// agentflow-webhook/src/errors.rs
// ============================================================================
// Module: Webhook Errors
// Description: Error taxonomy for outbound delivery and inbound validation.
// Purpose: Give callers typed failure reasons without leaking transport
//          internals.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while validating an inbound HMAC-signed request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// None of the recognized signature headers were present.
    #[error("no recognized signature header present")]
    MissingSignature,
    /// The signature header value was not valid hex.
    #[error("signature header is not valid hex")]
    MalformedSignature,
    /// The computed signature did not match the one supplied.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// `X-Timestamp` was outside the configured skew window.
    #[error("timestamp outside allowed skew: |now - t| = {skew_s}s")]
    ReplaySuspected {
        /// Observed absolute skew, in seconds.
        skew_s: u64,
    },
    /// `X-Timestamp` was present but not a valid integer.
    #[error("timestamp header is not a valid integer")]
    MalformedTimestamp,
}

/// Errors raised while dispatching or delivering a webhook event.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No endpoints were subscribed to the dispatched event type.
    #[error("no active endpoint subscribed to event type: {0}")]
    NoSubscribers(String),
    /// The payload could not be serialized to JSON bytes.
    #[error("failed to serialize webhook payload: {0}")]
    Serialization(String),
}
