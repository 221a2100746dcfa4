// agentflow-rcr/src/scoring.rs
// ============================================================================
// Module: Role Scoring
// Description: Six-dimension per-role scores, weighted combination, and
//              cross-role normalization.
// Purpose: Produce the `RoleScore` candidates `selection` picks among.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! Each dimension answers one question about how well a role fits this step:
//! can it handle the load (`complexity`), does it have the right tools
//! (`domain`), will it respond fast enough (`response_time`), is it free
//! (`resource`), will it meet the quality bar (`quality`), and can it handle
//! the context (`context`). Dimensions combine with fixed weights, then every
//! role's raw score is divided by the maximum raw score so the top candidate
//! always reads `1.0`.

use std::collections::BTreeMap;

use agentflow_core::Role;
use agentflow_core::RoleScore;

use crate::analysis::ContextAnalysis;
use crate::analysis::QueryAnalysis;

/// Optional caller-supplied routing requirements.
#[derive(Debug, Clone, Default)]
pub struct RoutingRequirements {
    /// Maximum acceptable response time, in milliseconds.
    pub max_response_time_ms: Option<u64>,
    /// Minimum acceptable quality, in `[0, 1]`.
    pub min_quality: Option<f64>,
    /// Capability tags the selected role must cover.
    pub required_capabilities: Vec<String>,
}

/// Dimension weights from the routing contract; fixed, not configurable.
struct Weights;

impl Weights {
    /// Weight applied to the `complexity` dimension.
    const COMPLEXITY: f64 = 0.25;
    /// Weight applied to the `domain` (capability) dimension.
    const DOMAIN: f64 = 0.20;
    /// Weight applied to the `response_time` dimension.
    const RESPONSE_TIME: f64 = 0.20;
    /// Weight applied to the `resource` dimension.
    const RESOURCE: f64 = 0.15;
    /// Weight applied to the `quality` dimension.
    const QUALITY: f64 = 0.10;
    /// Weight applied to the `context` dimension.
    const CONTEXT: f64 = 0.10;
}

/// `1 − |L − complexity_max|/complexity_max` if `L ≤ complexity_max`, else
/// `max(0, 1 − (L − complexity_max))`.
fn complexity_score(load: f64, complexity_max: f64) -> f64 {
    if complexity_max <= 0.0 {
        return 0.0;
    }
    if load <= complexity_max {
        1.0 - (load - complexity_max).abs() / complexity_max
    } else {
        (1.0 - (load - complexity_max)).max(0.0)
    }
}

/// Fraction of `required` present in `available`; `1.0` if none required.
fn capability_score(required: &[String], available: &[String]) -> f64 {
    if required.is_empty() {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "capability counts stay far below f64's exact-integer range")]
    let present = required.iter().filter(|cap| available.contains(cap)).count() as f64 / required.len() as f64;
    present
}

/// `1 − 0.5·(avg/required)` if `avg ≤ required`, else
/// `max(0, 1 − (avg−required)/required)`.
fn response_time_score(avg_ms: u32, required_ms: Option<u64>) -> f64 {
    let Some(required_ms) = required_ms else {
        return 1.0;
    };
    if required_ms == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "millisecond magnitudes stay far below f64's exact-integer range")]
    let avg = f64::from(avg_ms);
    #[allow(clippy::cast_precision_loss, reason = "millisecond magnitudes stay far below f64's exact-integer range")]
    let required = required_ms as f64;
    if avg <= required {
        1.0 - 0.5 * (avg / required)
    } else {
        (1.0 - (avg - required) / required).max(0.0)
    }
}

/// Piecewise-linear score in utilization `u = load/capacity`.
fn resource_score(load: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "load/capacity counts stay far below f64's exact-integer range")]
    let utilization = f64::from(load) / f64::from(capacity);
    if utilization < 0.5 {
        1.0
    } else if utilization < 0.75 {
        1.0 - 0.3 * (utilization - 0.5) / 0.25
    } else {
        (1.0 - utilization).max(0.0)
    }
}

/// `1` if `complexity_max ≥ min_quality`, else `complexity_max / min_quality`.
fn quality_score(complexity_max: f64, min_quality: Option<f64>) -> f64 {
    let Some(min_quality) = min_quality else {
        return 1.0;
    };
    if min_quality <= 0.0 {
        return 1.0;
    }
    if complexity_max >= min_quality {
        1.0
    } else {
        complexity_max / min_quality
    }
}

/// `1` if `richness ≤ complexity_max`, else `max(0, 1 − (richness − complexity_max))`.
fn context_score(richness: f64, complexity_max: f64) -> f64 {
    if richness <= complexity_max {
        1.0
    } else {
        (1.0 - (richness - complexity_max)).max(0.0)
    }
}

/// Computes the six raw dimension scores for `role` against the analyzed
/// query, context, current `load`, and optional `requirements`.
#[must_use]
pub fn dimension_scores(
    role: &Role,
    query: &QueryAnalysis,
    context: &ContextAnalysis,
    load: u32,
    requirements: &RoutingRequirements,
) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    scores.insert("complexity".to_string(), complexity_score(query.complexity, role.complexity_max));
    scores.insert(
        "domain".to_string(),
        capability_score(&requirements.required_capabilities, &role.capabilities),
    );
    scores.insert(
        "response_time".to_string(),
        response_time_score(role.response_time_avg_ms, requirements.max_response_time_ms),
    );
    scores.insert("resource".to_string(), resource_score(load, role.load_capacity));
    scores.insert("quality".to_string(), quality_score(role.complexity_max, requirements.min_quality));
    scores.insert("context".to_string(), context_score(context.richness, role.complexity_max));
    scores
}

/// Combines `scores` with the fixed dimension weights into one raw value.
#[must_use]
pub fn weighted_raw_score(scores: &BTreeMap<String, f64>) -> f64 {
    scores.get("complexity").copied().unwrap_or(0.0) * Weights::COMPLEXITY
        + scores.get("domain").copied().unwrap_or(0.0) * Weights::DOMAIN
        + scores.get("response_time").copied().unwrap_or(0.0) * Weights::RESPONSE_TIME
        + scores.get("resource").copied().unwrap_or(0.0) * Weights::RESOURCE
        + scores.get("quality").copied().unwrap_or(0.0) * Weights::QUALITY
        + scores.get("context").copied().unwrap_or(0.0) * Weights::CONTEXT
}

/// Scores every role in `roles`, then normalizes by dividing each raw score
/// by the maximum raw score across all candidates.
#[must_use]
pub fn score_roles(
    roles: &[Role],
    query: &QueryAnalysis,
    context: &ContextAnalysis,
    loads: &BTreeMap<String, u32>,
    requirements: &RoutingRequirements,
) -> Vec<RoleScore> {
    let raw: Vec<(&Role, BTreeMap<String, f64>, f64)> = roles
        .iter()
        .map(|role| {
            let load = loads.get(role.name.as_str()).copied().unwrap_or(0);
            let dims = dimension_scores(role, query, context, load, requirements);
            let score = weighted_raw_score(&dims);
            (role, dims, score)
        })
        .collect();

    let max_raw = raw.iter().map(|(_, _, score)| *score).fold(0.0_f64, f64::max);

    raw.into_iter()
        .map(|(role, dims, score)| {
            let normalized = if max_raw > 0.0 { score / max_raw } else { 0.0 };
            RoleScore { role: role.name.clone(), normalized_score: normalized, per_dimension_scores: dims }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn complexity_score_peaks_at_the_role_ceiling() {
        assert_eq!(complexity_score(0.4, 0.4), 1.0);
        assert!(complexity_score(0.9, 0.4) < complexity_score(0.5, 0.4));
    }

    #[test]
    fn capability_score_is_fraction_present() {
        let available = vec!["analysis".to_string(), "comparison".to_string()];
        let required = vec!["analysis".to_string(), "synthesis".to_string()];
        assert_eq!(capability_score(&required, &available), 0.5);
        assert_eq!(capability_score(&[], &available), 1.0);
    }

    #[test]
    fn resource_score_drops_as_utilization_rises() {
        assert_eq!(resource_score(1, 10), 1.0);
        assert!(resource_score(8, 10) < 1.0);
        assert!(resource_score(10, 10) < resource_score(8, 10));
    }

    #[test]
    fn top_role_normalizes_to_one() {
        let roles = agentflow_core::canonical_roles();
        let query = QueryAnalysis {
            complexity: 0.85,
            domain_specificity: 0.5,
            information_density: 0.5,
            query_type: crate::analysis::QueryType::Analytical,
            concepts: vec![],
        };
        let context = ContextAnalysis { richness: 0.2, required_capabilities: vec![], complexity: 0.1, temporal_requirements: false, nested_levels: 0 };
        let loads = BTreeMap::new();
        let scores = score_roles(&roles, &query, &context, &loads, &RoutingRequirements::default());
        let max = scores.iter().map(|s| s.normalized_score).fold(0.0_f64, f64::max);
        assert!((max - 1.0).abs() < f64::EPSILON);
    }

    proptest::proptest! {
        #[test]
        fn complexity_score_always_stays_in_unit_range(load in 0.0f64..=1.0, ceiling in 0.01f64..=1.0) {
            let score = complexity_score(load, ceiling);
            assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn resource_score_always_stays_in_unit_range(load in 0u32..1000, capacity in 1u32..1000) {
            let score = resource_score(load, capacity);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
