// agentflow-core/src/ids.rs
// ============================================================================
// Module: Identifiers
// Description: Canonical opaque identifiers used throughout the orchestrator.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque newtypes over `String`. They serialize transparently
//! so they round-trip through artifacts and wire payloads without wrapper
//! noise. Validation (format, length) is handled at request boundaries, not
//! here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Defines a newtype identifier with the standard constructor/accessor set.
macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

id_type!(TenantId, "Tenant identifier scoping every Run and quota check.");
id_type!(RunId, "Run identifier, unique per orchestration request.");
id_type!(CorrelationId, "Caller-supplied correlation identifier threaded through artifacts.");
id_type!(SubQuestionId, "Monotonically assigned sub-question identifier within a Plan.");

impl SubQuestionId {
    /// Orders ids the way the spec's "ascending id" tie-break rule intends:
    /// a numeric suffix compares by value, so `sq-2` sorts before `sq-10`.
    /// Falls back to plain string comparison when either id lacks a
    /// trailing run of digits or the prefixes differ.
    #[must_use]
    pub fn cmp_ascending(&self, other: &Self) -> std::cmp::Ordering {
        let (prefix_a, suffix_a) = split_numeric_suffix(&self.0);
        let (prefix_b, suffix_b) = split_numeric_suffix(&other.0);
        if prefix_a != prefix_b {
            return self.0.cmp(&other.0);
        }
        match (suffix_a, suffix_b) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

/// Splits `s` into `(prefix, numeric suffix)` at the longest trailing run of
/// ASCII digits, e.g. `"sq-10" -> ("sq-", Some(10))`.
fn split_numeric_suffix(s: &str) -> (&str, Option<u64>) {
    let digits_start = s.rfind(|c: char| !c.is_ascii_digit()).map_or(0, |i| i + 1);
    if digits_start == s.len() {
        return (s, None);
    }
    let (prefix, digits) = s.split_at(digits_start);
    match digits.parse::<u64>() {
        Ok(value) => (prefix, Some(value)),
        Err(_) => (s, None),
    }
}
id_type!(StepId, "Step identifier; equal to the originating SubQuestionId.");
id_type!(RoleName, "Canonical role name (analyst, synthesizer, specialist, coordinator, validator).");
id_type!(WebhookId, "Webhook endpoint identifier.");
id_type!(DeliveryId, "Stable delivery identifier shared across retries of one event.");
id_type!(CacheKey, "Opaque cache key used across all tiers.");

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn round_trips_through_json() {
        let id = RunId::new("run-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"run-1\"");
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut ids = vec![SubQuestionId::new("sq-2"), SubQuestionId::new("sq-1")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "sq-1");
    }

    #[test]
    fn cmp_ascending_orders_numeric_suffixes_by_value() {
        let mut ids = vec![SubQuestionId::new("sq-10"), SubQuestionId::new("sq-2"), SubQuestionId::new("sq-1")];
        ids.sort_by(SubQuestionId::cmp_ascending);
        assert_eq!(ids.iter().map(SubQuestionId::as_str).collect::<Vec<_>>(), ["sq-1", "sq-2", "sq-10"]);
    }

    proptest::proptest! {
        #[test]
        fn any_string_round_trips_through_json(raw in ".*") {
            let id = RunId::new(raw.clone());
            let json = serde_json::to_string(&id).unwrap();
            let back: RunId = serde_json::from_str(&json).unwrap();
            assert_eq!(back.as_str(), raw);
        }
    }
}
