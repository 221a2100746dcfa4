// agentflow-rcr/src/selection.rs
// ============================================================================
// Module: Role Selection
// Description: Threshold admission, capacity check, and canonical tie-break
//              over a set of scored role candidates.
// Purpose: Turn `RoleScore`s into the single chosen role, or the coordinator
//          fallback.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! A role qualifies when its normalized score clears the admission threshold
//! and it has spare capacity. Among qualifiers the highest score wins; ties
//! break on the fixed canonical role order (`coordinator, validator, analyst,
//! synthesizer, specialist`), which is also the order `canonical_roles`
//! already returns its candidates in, so a stable sort over that order
//! suffices.

use std::collections::BTreeMap;

use agentflow_core::Role;
use agentflow_core::RoleName;
use agentflow_core::RoleScore;

/// Minimum normalized score a role must clear to be considered.
pub const SELECTION_THRESHOLD: f64 = 0.3;

/// A role selected for a step, with the load observed immediately before
/// the decision was made.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Chosen role.
    pub role: RoleName,
    /// The chosen role's entry among `alternatives`.
    pub score: RoleScore,
    /// Role load observed immediately before selection.
    pub load_before: u32,
    /// True when no candidate cleared the threshold and `coordinator` was
    /// used as a fallback.
    pub fallback_mode: bool,
}

/// Selects a role from `scores`, using `roles` (in canonical tie-break
/// order) and `loads`/`capacities` to apply the capacity check.
///
/// Falls back to `coordinator` with `fallback_mode=true` when no candidate
/// clears [`SELECTION_THRESHOLD`] with spare capacity.
#[must_use]
pub fn select_role(roles: &[Role], scores: &[RoleScore], loads: &BTreeMap<String, u32>) -> Selection {
    let mut best: Option<(&Role, &RoleScore)> = None;
    for role in roles {
        let Some(score) = scores.iter().find(|s| s.role == role.name) else {
            continue;
        };
        let load = loads.get(role.name.as_str()).copied().unwrap_or(0);
        if score.normalized_score < SELECTION_THRESHOLD || load >= role.load_capacity {
            continue;
        }
        match best {
            Some((_, best_score)) if score.normalized_score <= best_score.normalized_score => {}
            _ => best = Some((role, score)),
        }
    }

    if let Some((role, score)) = best {
        let load_before = loads.get(role.name.as_str()).copied().unwrap_or(0);
        return Selection { role: role.name.clone(), score: score.clone(), load_before, fallback_mode: false };
    }

    let coordinator_name = RoleName::new("coordinator");
    let fallback_score = scores
        .iter()
        .find(|s| s.role == coordinator_name)
        .cloned()
        .unwrap_or_else(|| RoleScore { role: coordinator_name.clone(), normalized_score: 0.0, per_dimension_scores: BTreeMap::new() });
    let load_before = loads.get("coordinator").copied().unwrap_or(0);
    Selection { role: coordinator_name, score: fallback_score, load_before, fallback_mode: true }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn score(role: &str, normalized: f64) -> RoleScore {
        RoleScore { role: RoleName::new(role), normalized_score: normalized, per_dimension_scores: BTreeMap::new() }
    }

    #[test]
    fn highest_qualifying_score_wins() {
        let roles = agentflow_core::canonical_roles();
        let scores = vec![score("coordinator", 0.4), score("validator", 0.9), score("analyst", 0.5)];
        let loads = BTreeMap::new();
        let selection = select_role(&roles, &scores, &loads);
        assert_eq!(selection.role.as_str(), "validator");
        assert!(!selection.fallback_mode);
    }

    #[test]
    fn ties_break_on_canonical_order() {
        let roles = agentflow_core::canonical_roles();
        let scores = vec![score("coordinator", 0.7), score("validator", 0.7), score("analyst", 0.7)];
        let loads = BTreeMap::new();
        let selection = select_role(&roles, &scores, &loads);
        assert_eq!(selection.role.as_str(), "coordinator");
    }

    #[test]
    fn no_qualifier_falls_back_to_coordinator() {
        let roles = agentflow_core::canonical_roles();
        let scores = vec![score("coordinator", 0.1), score("validator", 0.2)];
        let loads = BTreeMap::new();
        let selection = select_role(&roles, &scores, &loads);
        assert_eq!(selection.role.as_str(), "coordinator");
        assert!(selection.fallback_mode);
    }

    #[test]
    fn full_capacity_disqualifies_a_role() {
        let roles = agentflow_core::canonical_roles();
        let scores = vec![score("coordinator", 0.5), score("validator", 0.9)];
        let mut loads = BTreeMap::new();
        loads.insert("validator".to_string(), 6);
        let selection = select_role(&roles, &scores, &loads);
        assert_eq!(selection.role.as_str(), "coordinator");
        assert!(!selection.fallback_mode);
    }
}
