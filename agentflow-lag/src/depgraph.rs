// agentflow-lag/src/depgraph.rs
// ============================================================================
// Module: Dependency Graph Construction
// Description: Lexical dependency detection, topological ordering, and BFS
//              layering over a decomposed plan's sub-questions.
// Purpose: Turn an unordered set of sub-questions into the DAG the pipeline
//          executes against.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! A later sub-question depends on an earlier one when it references an
//! entity the earlier one introduced — approximated here as shared
//! capitalized-or-long-word tokens. Ties in topological order and BFS
//! layering both break on ascending sub-question id, per the ordering rule.

use std::collections::BTreeMap;
use std::collections::HashSet;

use agentflow_core::DepGraph;
use agentflow_core::SubQ;
use agentflow_core::SubQuestionId;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "for", "is", "are", "was", "were", "be", "and", "or", "but", "with",
    "that", "this", "what", "which", "how", "why",
];

/// Tokens treated as the "entities" a sub-question introduces: lowercase,
/// non-stopword words of length >= 5.
fn entities_of(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 5 && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Builds the dependency graph: `b` depends on `a` when `a` precedes `b` in
/// `sub_questions` and their entity sets intersect.
#[must_use]
pub fn build_depgraph(sub_questions: &[SubQ]) -> DepGraph {
    let entities: Vec<HashSet<String>> = sub_questions.iter().map(|sq| entities_of(&sq.text)).collect();
    let mut predecessors: BTreeMap<SubQuestionId, Vec<SubQuestionId>> = BTreeMap::new();
    for (i, sub_question) in sub_questions.iter().enumerate() {
        let mut preds = Vec::new();
        for (j, earlier) in sub_questions.iter().enumerate().take(i) {
            if !entities[j].is_disjoint(&entities[i]) {
                preds.push(earlier.id.clone());
            }
        }
        predecessors.insert(sub_question.id.clone(), preds);
    }
    DepGraph { predecessors }
}

/// Computes a topological order (ties broken by ascending id) and BFS
/// layers (`parallel_groups[k]` holds every id whose predecessors are all
/// in earlier layers) over `ids` under `depgraph`.
///
/// Returns `None` if `depgraph` contains a cycle, which should not occur
/// given [`build_depgraph`] only links earlier ids to later ones.
#[must_use]
pub fn order_and_layer(ids: &[SubQuestionId], depgraph: &DepGraph) -> Option<(Vec<SubQuestionId>, Vec<Vec<SubQuestionId>>)> {
    let mut successors: BTreeMap<SubQuestionId, Vec<SubQuestionId>> = BTreeMap::new();
    let mut remaining_in_degree: BTreeMap<SubQuestionId, usize> = BTreeMap::new();
    for id in ids {
        remaining_in_degree.insert(id.clone(), depgraph.predecessors_of(id).len());
        for predecessor in depgraph.predecessors_of(id) {
            successors.entry(predecessor.clone()).or_default().push(id.clone());
        }
    }

    let mut order = Vec::with_capacity(ids.len());
    let mut layers = Vec::new();
    let mut assigned: HashSet<SubQuestionId> = HashSet::new();

    while assigned.len() < ids.len() {
        let mut layer: Vec<SubQuestionId> = ids
            .iter()
            .filter(|id| !assigned.contains(*id) && remaining_in_degree.get(*id).copied() == Some(0))
            .cloned()
            .collect();
        if layer.is_empty() {
            return None;
        }
        layer.sort_by(SubQuestionId::cmp_ascending);
        for id in &layer {
            assigned.insert(id.clone());
            order.push(id.clone());
            if let Some(succs) = successors.get(id) {
                for successor in succs {
                    if let Some(degree) = remaining_in_degree.get_mut(successor) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
        }
        layers.push(layer);
    }

    Some((order, layers))
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    fn sub_q(id: &str, text: &str) -> SubQ {
        SubQ {
            id: SubQuestionId::new(id),
            text: text.to_string(),
            parent_id: None,
            estimated_complexity: 0.5,
            termination_checks: Vec::new(),
        }
    }

    #[test]
    fn later_question_depends_on_shared_entity() {
        let sub_questions = vec![
            sub_q("sq-1", "What is the population of Japan"),
            sub_q("sq-2", "How does Japan compare to Germany"),
        ];
        let graph = build_depgraph(&sub_questions);
        assert_eq!(graph.predecessors_of(&SubQuestionId::new("sq-2")), &[SubQuestionId::new("sq-1")]);
    }

    #[test]
    fn independent_questions_form_one_layer() {
        let sub_questions = vec![sub_q("sq-1", "population of Oslo"), sub_q("sq-2", "climate of Madrid")];
        let graph = build_depgraph(&sub_questions);
        let ids: Vec<_> = sub_questions.iter().map(|sq| sq.id.clone()).collect();
        let (order, layers) = order_and_layer(&ids, &graph).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].len(), 2);
    }

    #[test]
    fn layer_tie_break_is_numeric_not_lexicographic_past_nine() {
        // 11 mutually independent sub-questions land in one layer; lexicographic
        // Ord on the wrapped String would sort "sq-10" before "sq-2".
        let sub_questions: Vec<SubQ> = (1..=11).map(|n| sub_q(&format!("sq-{n}"), &format!("fragment number {n}"))).collect();
        let graph = build_depgraph(&sub_questions);
        let ids: Vec<_> = sub_questions.iter().map(|sq| sq.id.clone()).collect();
        let (order, layers) = order_and_layer(&ids, &graph).unwrap();
        assert_eq!(layers.len(), 1);
        let expected: Vec<SubQuestionId> = (1..=11).map(|n| SubQuestionId::new(format!("sq-{n}"))).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn chain_dependency_produces_one_layer_each() {
        let sub_questions = vec![
            sub_q("sq-1", "What is Kubernetes networking"),
            sub_q("sq-2", "How does Kubernetes networking compare to Nomad"),
        ];
        let graph = build_depgraph(&sub_questions);
        let ids: Vec<_> = sub_questions.iter().map(|sq| sq.id.clone()).collect();
        let (order, layers) = order_and_layer(&ids, &graph).unwrap();
        assert_eq!(order, vec![SubQuestionId::new("sq-1"), SubQuestionId::new("sq-2")]);
        assert_eq!(layers.len(), 2);
    }
}
