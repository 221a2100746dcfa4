// agentflow-pipeline/src/signature.rs
// ============================================================================
// Module: Step Signature
// Description: Computes the cache key a step reads through and writes back
//              to, per spec §4.3: hash(role, query_fragment, ordered
//              context digest, seed).
// Purpose: One place that defines cache key derivation so every caller
//          agrees on it.
// Dependencies: agentflow-core
// ============================================================================

use agentflow_core::CacheKey;
use agentflow_core::HashDigest;
use agentflow_core::hashing::hash_canonical_json;
use agentflow_core::hashing::hash_parts;

/// Hashes `context` canonically, for inclusion in a step signature. Reused
/// across every step in a run so it is only computed once.
///
/// # Errors
///
/// Returns [`agentflow_core::HashError`] if `context` cannot be
/// canonicalized (non-finite floats, non-string map keys after conversion).
pub fn context_digest(context: &serde_json::Value) -> Result<HashDigest, agentflow_core::HashError> {
    hash_canonical_json(context)
}

/// Derives the cache key for one step: `hash(role, query_fragment,
/// context_digest, seed)`.
#[must_use]
pub fn step_signature(role: &str, query_fragment: &str, context_digest: &HashDigest, seed: u64) -> CacheKey {
    let seed_str = seed.to_string();
    let digest = hash_parts([role, query_fragment, context_digest.as_str(), seed_str.as_str()]);
    CacheKey::new(digest.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_for_the_same_inputs() {
        let ctx = context_digest(&serde_json::json!({"a": 1})).unwrap();
        let first = step_signature("analyst", "what is x", &ctx, 42);
        let second = step_signature("analyst", "what is x", &ctx, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn signature_changes_with_role() {
        let ctx = context_digest(&serde_json::json!({"a": 1})).unwrap();
        let analyst = step_signature("analyst", "what is x", &ctx, 42);
        let synthesizer = step_signature("synthesizer", "what is x", &ctx, 42);
        assert_ne!(analyst, synthesizer);
    }
}
