// agentflow-webhook/src/signing.rs
// ============================================================================
// Module: Outbound Signing
// Description: HMAC-SHA256 request signing for webhook transmission.
// Purpose: Produce the `X-Signature-256`/`X-Timestamp`/`X-Delivery-Id` header
//          triple every outbound delivery carries.
// Dependencies: hmac, sha2, hex
// ============================================================================

//! ## Overview
//! `sign` computes `hex(HMAC_SHA256(secret, raw_body))` over the exact bytes
//! that will be transmitted; `build_headers` assembles the full outbound
//! header set around it.

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;

/// HMAC-SHA256 keyed on a webhook endpoint's shared secret.
type HmacSha256 = Hmac<Sha256>;

/// Computes `hex(HMAC_SHA256(secret, raw_body))`.
#[must_use]
pub fn sign(secret: &str, raw_body: &[u8]) -> String {
    #[allow(clippy::expect_used, reason = "HMAC accepts keys of any length; this call cannot fail")]
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the outbound header set for one delivery attempt.
///
/// `timestamp_ms` is Unix milliseconds at the moment of signing.
#[must_use]
pub fn build_headers(secret: &str, raw_body: &[u8], delivery_id: &str, timestamp_ms: i64) -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("X-Signature-256".to_string(), format!("sha256={}", sign(secret, raw_body))),
        ("X-Timestamp".to_string(), timestamp_ms.to_string()),
        ("X-Delivery-Id".to_string(), delivery_id.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn same_secret_and_body_sign_identically() {
        let a = sign("top-secret", b"{\"event\":\"run.completed\"}");
        let b = sign("top-secret", b"{\"event\":\"run.completed\"}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_secrets_diverge() {
        let a = sign("secret-a", b"payload");
        let b = sign("secret-b", b"payload");
        assert_ne!(a, b);
    }

    #[test]
    fn headers_carry_the_expected_keys() {
        let headers = build_headers("secret", b"payload", "delivery-1", 1_700_000_000_000);
        let names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"X-Signature-256"));
        assert!(names.contains(&"X-Timestamp"));
        assert!(names.contains(&"X-Delivery-Id"));
    }
}
