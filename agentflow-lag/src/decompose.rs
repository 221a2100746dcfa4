// agentflow-lag/src/decompose.rs
// ============================================================================
// Module: Cartesian Decomposition
// Description: Splits a query into uncertainty fragments and turns them
//              into prioritized, budget-capped sub-questions.
// Purpose: Produce the `SubQ` set a dependency graph can then be built
//          over.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! "Uncertainties" are clause-level fragments of the query that still carry
//! an open question — heuristically, every clause split on a coordinating
//! conjunction or a comma. When more fragments exist than
//! `max_sub_questions` allows, fragments are kept by (1) higher estimated
//! complexity, (2) earlier position, (3) ascending assigned id, matching
//! the prioritization rule exactly.

use agentflow_config::ComplexityWeights;
use agentflow_core::SubQ;
use agentflow_core::SubQuestionId;

use crate::load::cognitive_load;

const CLAUSE_CONJUNCTIONS: &[&str] = &[" and then ", " and ", ", and ", "; ", ", "];

/// Splits `query` into non-empty, trimmed clause fragments.
fn split_into_clauses(query: &str) -> Vec<String> {
    let mut fragments = vec![query.to_string()];
    for conjunction in CLAUSE_CONJUNCTIONS {
        fragments = fragments.into_iter().flat_map(|fragment| fragment.split(conjunction).map(str::to_string).collect::<Vec<_>>()).collect();
    }
    fragments.into_iter().map(|fragment| fragment.trim().trim_end_matches(['.', '?', '!']).to_string()).filter(|fragment| !fragment.is_empty()).collect()
}

/// Builds the full, unranked sub-question set for `query`, ids assigned in
/// ascending emission order (`sq-1`, `sq-2`, ...). Each fragment's
/// `estimated_complexity` is its own cognitive-load score under `weights`.
#[must_use]
pub fn identify_sub_questions(query: &str, weights: ComplexityWeights) -> Vec<SubQ> {
    split_into_clauses(query)
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let estimated_complexity = cognitive_load(&text, "", weights);
            SubQ {
                id: SubQuestionId::new(format!("sq-{}", index + 1)),
                text,
                parent_id: None,
                estimated_complexity,
                termination_checks: Vec::new(),
            }
        })
        .collect()
}

/// Keeps at most `max_sub_questions` entries from `sub_questions`, by (1)
/// higher estimated complexity, (2) earlier original position, (3)
/// ascending id — then re-sorts the kept set back into original-position
/// order.
#[must_use]
pub fn prioritize_and_cap(mut sub_questions: Vec<SubQ>, max_sub_questions: usize) -> Vec<SubQ> {
    if sub_questions.len() <= max_sub_questions {
        return sub_questions;
    }
    let mut ranked: Vec<(usize, SubQ)> = sub_questions.drain(..).enumerate().collect();
    ranked.sort_by(|(pos_a, a), (pos_b, b)| {
        b.estimated_complexity
            .partial_cmp(&a.estimated_complexity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(pos_a.cmp(pos_b))
            .then_with(|| a.id.cmp_ascending(&b.id))
    });
    ranked.truncate(max_sub_questions);
    ranked.sort_by_key(|(pos, _)| *pos);
    ranked.into_iter().map(|(_, sub_question)| sub_question).collect()
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn splits_comparison_query_into_multiple_fragments() {
        let sub_questions = identify_sub_questions(
            "Compare the economic policies of Japan and Germany, and analyze how each affects trade",
            ComplexityWeights::default(),
        );
        assert!(sub_questions.len() >= 2, "expected multiple fragments, got {}", sub_questions.len());
    }

    #[test]
    fn capping_keeps_highest_complexity_fragments() {
        let sub_questions = vec![
            SubQ {
                id: SubQuestionId::new("sq-1"),
                text: "low".to_string(),
                parent_id: None,
                estimated_complexity: 0.1,
                termination_checks: Vec::new(),
            },
            SubQ {
                id: SubQuestionId::new("sq-2"),
                text: "high".to_string(),
                parent_id: None,
                estimated_complexity: 0.9,
                termination_checks: Vec::new(),
            },
        ];
        let capped = prioritize_and_cap(sub_questions, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, SubQuestionId::new("sq-2"));
    }

    #[test]
    fn within_budget_is_unchanged() {
        let sub_questions = identify_sub_questions("What is the capital of France", ComplexityWeights::default());
        let before = sub_questions.len();
        let capped = prioritize_and_cap(sub_questions, 9);
        assert_eq!(capped.len(), before);
    }
}
