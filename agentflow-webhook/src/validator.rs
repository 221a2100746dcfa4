// agentflow-webhook/src/validator.rs
// ============================================================================
// Module: Inbound HMAC Validator
// Description: Verifies inbound webhook-style requests against a shared
//              secret, with replay protection via timestamp skew.
// Purpose: Give the HTTP ingress one call that turns headers + raw body
//          into accept/reject.
// Dependencies: agentflow-core, hmac, sha1, sha2, subtle, hex
// ============================================================================

//! ## Overview
//! `HmacValidator::validate` extracts a signature from the first recognized
//! header, infers its algorithm from an explicit prefix or, failing that,
//! from the decoded length, recomputes the expected signature over the raw
//! body bytes, and compares in constant time. A present `X-Timestamp` is
//! checked against [`HmacConfig::max_skew_s`] to reject replays.

use std::sync::Arc;

use agentflow_config::HmacConfig;
use agentflow_core::Clock;
use agentflow_core::SecretSource;
use hmac::Hmac;
use hmac::Mac;
use sha1::Sha1;
use sha2::Sha256;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::errors::ValidationError;

/// Header names checked, in priority order, for an inbound signature.
const SIGNATURE_HEADERS: &[&str] = &["X-Signature-256", "X-Hub-Signature-256", "X-Signature", "X-Hub-Signature", "Signature"];

/// Prefixes a signature value may carry, naming its algorithm explicitly.
const KNOWN_PREFIXES: &[(&str, Algorithm)] = &[
    ("sha256=", Algorithm::Sha256),
    ("sha1=", Algorithm::Sha1),
    ("sha512=", Algorithm::Sha512),
];

/// The HMAC digest algorithm a signature was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    /// HMAC-SHA1 (40 hex characters).
    Sha1,
    /// HMAC-SHA256 (64 hex characters).
    Sha256,
    /// HMAC-SHA512 (128 hex characters).
    Sha512,
}

impl Algorithm {
    /// Infers an algorithm from a decoded signature's byte length, defaulting
    /// to SHA-256 when the length matches none of the known digest sizes.
    const fn from_byte_len(len: usize) -> Self {
        match len {
            20 => Self::Sha1,
            64 => Self::Sha512,
            _ => Self::Sha256,
        }
    }

    /// Computes `HMAC(secret, body)` under this algorithm.
    fn compute(self, secret: &[u8], body: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => mac_bytes::<Hmac<Sha1>>(secret, body),
            Self::Sha256 => mac_bytes::<Hmac<Sha256>>(secret, body),
            Self::Sha512 => mac_bytes::<Hmac<Sha512>>(secret, body),
        }
    }
}

/// Computes a keyed MAC of type `M` over `body` and returns its raw bytes.
fn mac_bytes<M: Mac + hmac::digest::KeyInit>(secret: &[u8], body: &[u8]) -> Vec<u8> {
    #[allow(clippy::expect_used, reason = "HMAC accepts keys of any length; this call cannot fail")]
    let mut mac = M::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// One extracted, not-yet-verified inbound signature.
struct ExtractedSignature {
    /// Header the signature was read from, used only for algorithm hints.
    header: &'static str,
    /// Decoded signature bytes.
    bytes: Vec<u8>,
}

/// Finds the first recognized signature header present in `headers` and
/// decodes its value, stripping a known algorithm prefix if present.
fn extract_signature(headers: &[(String, String)]) -> Result<ExtractedSignature, ValidationError> {
    for candidate in SIGNATURE_HEADERS {
        let Some((_, raw)) = headers.iter().find(|(name, _)| name.eq_ignore_ascii_case(candidate)) else {
            continue;
        };
        let stripped = KNOWN_PREFIXES.iter().find_map(|(prefix, _)| raw.strip_prefix(*prefix)).unwrap_or(raw.as_str());
        let bytes = hex::decode(stripped).map_err(|_err| ValidationError::MalformedSignature)?;
        return Ok(ExtractedSignature { header: *candidate, bytes });
    }
    Err(ValidationError::MissingSignature)
}

/// Infers the signing algorithm for `signature`, preferring an explicit
/// prefix hint over the decoded-length fallback.
fn infer_algorithm(raw_value: &str, signature: &ExtractedSignature) -> Algorithm {
    for (prefix, algorithm) in KNOWN_PREFIXES {
        if raw_value.starts_with(*prefix) {
            return *algorithm;
        }
    }
    let _ = signature.header;
    Algorithm::from_byte_len(signature.bytes.len())
}

/// Validates an inbound request's signature and, if present, its timestamp.
pub struct HmacValidator<C> {
    /// Source of per-path shared secrets.
    secrets: Arc<dyn SecretSource>,
    /// Clock used to evaluate timestamp skew.
    clock: C,
    /// Skew and algorithm tolerances.
    config: HmacConfig,
}

impl<C: Clock> HmacValidator<C> {
    /// Builds a validator backed by `secrets` and `clock`.
    #[must_use]
    pub fn new(secrets: Arc<dyn SecretSource>, clock: C, config: HmacConfig) -> Self {
        Self { secrets, clock, config }
    }

    /// Validates `headers` and `raw_body` against the secret registered
    /// under `secret_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] variant describing why validation
    /// failed: no recognized header, malformed hex, signature mismatch, or
    /// a timestamp outside the configured skew window.
    pub async fn validate(&self, secret_path: &str, headers: &[(String, String)], raw_body: &[u8]) -> Result<(), ValidationError> {
        let signature = extract_signature(headers)?;
        let raw_value = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(signature.header))
            .map_or("", |(_, value)| value.as_str());
        let algorithm = infer_algorithm(raw_value, &signature);

        let secret = self.secrets.get_secret(secret_path).await.map_err(|_err| ValidationError::MissingSignature)?;
        let expected = algorithm.compute(secret.as_bytes(), raw_body);

        if expected.len() != signature.bytes.len() || expected.ct_eq(&signature.bytes).unwrap_u8() == 0 {
            return Err(ValidationError::SignatureMismatch);
        }

        self.check_timestamp(headers)
    }

    /// Rejects the request if `X-Timestamp` is present and outside the
    /// configured skew window; absent timestamps are accepted.
    fn check_timestamp(&self, headers: &[(String, String)]) -> Result<(), ValidationError> {
        let Some((_, raw)) = headers.iter().find(|(name, _)| name.eq_ignore_ascii_case("X-Timestamp")) else {
            return Ok(());
        };
        let sent_at: i64 = raw.trim().parse().map_err(|_err| ValidationError::MalformedTimestamp)?;
        let now_s = self.clock.now().as_unix_secs();
        let skew_s = now_s.saturating_sub(sent_at).unsigned_abs();
        if skew_s > self.config.max_skew_s {
            return Err(ValidationError::ReplaySuspected { skew_s });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agentflow_core::FixedClock;
    use agentflow_core::SecretError;
    use agentflow_core::Timestamp;
    use async_trait::async_trait;

    use super::*;

    struct StaticSecret(&'static str);

    #[async_trait]
    impl SecretSource for StaticSecret {
        async fn get_secret(&self, _name: &str) -> Result<String, SecretError> {
            Ok(self.0.to_string())
        }
    }

    fn validator_at(now_s: i64) -> HmacValidator<FixedClock> {
        let clock = FixedClock::new(Timestamp::from_millis(now_s * 1000));
        HmacValidator::new(Arc::new(StaticSecret("top-secret")), clock, HmacConfig::default())
    }

    #[tokio::test]
    async fn accepts_a_correctly_signed_body() {
        let body = b"{\"event\":\"run.completed\"}";
        let sig = crate::signing::sign("top-secret", body);
        let headers = vec![("X-Signature-256".to_string(), format!("sha256={sig}"))];
        let validator = validator_at(1_700_000_000);
        assert!(validator.validate("path", &headers, body).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_a_tampered_body() {
        let sig = crate::signing::sign("top-secret", b"original");
        let headers = vec![("X-Signature-256".to_string(), format!("sha256={sig}"))];
        let validator = validator_at(1_700_000_000);
        let err = validator.validate("path", &headers, b"tampered").await.unwrap_err();
        assert_eq!(err, ValidationError::SignatureMismatch);
    }

    #[tokio::test]
    async fn rejects_missing_signature_header() {
        let validator = validator_at(1_700_000_000);
        let err = validator.validate("path", &[], b"body").await.unwrap_err();
        assert_eq!(err, ValidationError::MissingSignature);
    }

    #[tokio::test]
    async fn rejects_a_stale_timestamp() {
        let body = b"payload";
        let sig = crate::signing::sign("top-secret", body);
        let headers = vec![
            ("X-Signature-256".to_string(), format!("sha256={sig}")),
            ("X-Timestamp".to_string(), "1699999000".to_string()),
        ];
        let validator = validator_at(1_700_000_000);
        let err = validator.validate("path", &headers, body).await.unwrap_err();
        assert!(matches!(err, ValidationError::ReplaySuspected { .. }));
    }

    #[test]
    fn infers_algorithm_from_unprefixed_length() {
        let sha1_len_sig = ExtractedSignature { header: "Signature", bytes: vec![0u8; 20] };
        assert_eq!(infer_algorithm("", &sha1_len_sig), Algorithm::Sha1);
        let sha256_len_sig = ExtractedSignature { header: "Signature", bytes: vec![0u8; 32] };
        assert_eq!(infer_algorithm("", &sha256_len_sig), Algorithm::Sha256);
    }
}
