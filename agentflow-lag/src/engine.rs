// agentflow-lag/src/engine.rs
// ============================================================================
// Module: LAG Decomposition Engine
// Description: The `Decompose(query, cfg) -> PlanResult | TerminationResult`
//              entry point tying load scoring, Cartesian decomposition,
//              dependency ordering, and the recursion-limit terminator
//              together.
// Purpose: Give callers one function that is a pure, reproducible function
//          of `(query, cfg, seed)`.
// Dependencies: agentflow-core, agentflow-config, tracing
// ============================================================================

//! ## Overview
//! `decompose` never touches wall-clock time or randomness: every ordering
//! rule (ascending id, earlier position) is already fully deterministic
//! from `(query, cfg)` alone, so the run-level seed plays no role here and
//! is not threaded through. Decomposition fails (an `Err`) only on
//! malformed input or an internal invariant violation; everything else is
//! a normal [`DecomposeOutcome`].

use agentflow_config::LagConfig;
use agentflow_core::HashDigest;
use agentflow_core::Plan;
use agentflow_core::RunId;
use agentflow_core::SubQ;
use agentflow_core::TerminationReason;
use agentflow_core::hashing::hash_canonical_json;
use tracing::debug;

use crate::decompose::identify_sub_questions;
use crate::decompose::prioritize_and_cap;
use crate::depgraph::build_depgraph;
use crate::depgraph::order_and_layer;
use crate::errors::LagError;
use crate::load::cognitive_load;
use crate::terminator::check_recursion_limit;
use crate::terminator::check_redundancy;

/// Either a fully ordered plan or the reason decomposition halted before
/// one could be produced.
#[derive(Debug, Clone)]
pub enum DecomposeOutcome {
    /// Decomposition (or the simple single-step case) succeeded.
    Plan(Plan),
    /// A terminator fired before a plan could be finalized.
    Terminated(TerminationReason),
}

/// Decomposes `query` into an ordered [`Plan`], or returns the
/// [`TerminationReason`] that stopped it first.
///
/// # Errors
///
/// Returns [`LagError::EmptyQuery`] or [`LagError::TooLong`] for malformed
/// input, or [`LagError::InvariantViolation`] if the constructed dependency
/// graph is cyclic (which [`build_depgraph`] should never produce, since it
/// only links earlier sub-questions to later ones).
pub fn decompose(run_id: RunId, query: &str, context: &str, cfg: &LagConfig) -> Result<DecomposeOutcome, LagError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(LagError::EmptyQuery);
    }
    if trimmed.len() > cfg.max_length {
        return Err(LagError::TooLong {
            max: cfg.max_length,
            actual: trimmed.len(),
        });
    }

    let load = cognitive_load(trimmed, context, cfg.complexity_weights);
    debug!(cognitive_load = load, threshold = cfg.cognitive_threshold, "scored query");

    if load <= cfg.cognitive_threshold {
        return simple_plan(run_id, trimmed, load);
    }

    let all_sub_questions = identify_sub_questions(trimmed, cfg.complexity_weights);
    let sub_questions = prioritize_and_cap(all_sub_questions, cfg.max_sub_questions as usize);

    let texts: Vec<String> = sub_questions.iter().map(|sq| sq.text.clone()).collect();
    if let Some(reason) = check_redundancy(&texts) {
        return Ok(DecomposeOutcome::Terminated(reason));
    }

    let depgraph = build_depgraph(&sub_questions);
    let ids: Vec<_> = sub_questions.iter().map(|sq| sq.id.clone()).collect();
    let Some((order, parallel_groups)) = order_and_layer(&ids, &depgraph) else {
        return Err(LagError::InvariantViolation("dependency graph contains a cycle".to_string()));
    };

    if let Some(reason) = check_recursion_limit(parallel_groups.len(), cfg.max_depth) {
        return Ok(DecomposeOutcome::Terminated(reason));
    }

    let signature = plan_signature(&order, &depgraph, &sub_questions)?;
    Ok(DecomposeOutcome::Plan(Plan {
        run_id,
        cognitive_load: load,
        sub_questions,
        depgraph,
        order,
        parallel_groups,
        signature,
    }))
}

/// Builds the single-step plan returned when `load <= cognitive_threshold`:
/// no decomposition, one step with the full budget.
fn simple_plan(run_id: RunId, query: &str, load: f64) -> Result<DecomposeOutcome, LagError> {
    let sub_question = SubQ {
        id: agentflow_core::SubQuestionId::new("sq-1"),
        text: query.to_string(),
        parent_id: None,
        estimated_complexity: load,
        termination_checks: Vec::new(),
    };
    let order = vec![sub_question.id.clone()];
    let depgraph = agentflow_core::DepGraph::default();
    let signature = plan_signature(&order, &depgraph, std::slice::from_ref(&sub_question))?;
    Ok(DecomposeOutcome::Plan(Plan {
        run_id,
        cognitive_load: load,
        sub_questions: vec![sub_question],
        depgraph,
        order: order.clone(),
        parallel_groups: vec![order],
        signature,
    }))
}

/// Hashes `(order, edges, normalized sub-question text)` into a stable plan
/// signature, so two plans whose steps agree but whose dependency edges
/// differ are never mistaken for the same plan.
///
/// # Errors
///
/// Returns [`LagError::InvariantViolation`] if canonicalization fails,
/// which would indicate a serialization bug rather than bad input.
fn plan_signature(order: &[agentflow_core::SubQuestionId], depgraph: &agentflow_core::DepGraph, sub_questions: &[SubQ]) -> Result<HashDigest, LagError> {
    let ordered: Vec<(String, String)> = order
        .iter()
        .map(|id| {
            let text = sub_questions.iter().find(|sq| &sq.id == id).map_or_else(String::new, |sq| sq.text.trim().to_lowercase());
            (id.as_str().to_string(), text)
        })
        .collect();
    let edges: Vec<(String, Vec<String>)> = depgraph.predecessors.iter().map(|(id, preds)| (id.as_str().to_string(), preds.iter().map(|pred| pred.as_str().to_string()).collect())).collect();
    let payload = (ordered, edges);
    hash_canonical_json(&payload).map_err(|err| LagError::InvariantViolation(err.to_string()))
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn simple_query_yields_single_step_plan() {
        let cfg = LagConfig::default();
        let outcome = decompose(RunId::new("run-1"), "What is the capital of France?", "", &cfg).unwrap();
        match outcome {
            DecomposeOutcome::Plan(plan) => assert!(plan.is_simple()),
            DecomposeOutcome::Terminated(reason) => panic!("expected a plan, got {reason:?}"),
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        let cfg = LagConfig::default();
        let result = decompose(RunId::new("run-1"), "   ", "", &cfg);
        assert!(matches!(result, Err(LagError::EmptyQuery)));
    }

    #[test]
    fn oversized_query_is_rejected() {
        let cfg = LagConfig::default();
        let huge = "a".repeat(cfg.max_length + 1);
        let result = decompose(RunId::new("run-1"), &huge, "", &cfg);
        assert!(matches!(result, Err(LagError::TooLong { .. })));
    }

    const COMPLEX_QUERY: &str = "Compare the economic policies of Japan and Germany, and analyze how each \
                                  affects trade under various certain conditions, however note that models \
                                  differ, and evaluate which approach it uses, and consider why this matters \
                                  for investors";
    const COMPLEX_CONTEXT: &str = "it depends on this and that, however it remains unclear";

    #[test]
    fn complex_query_decomposes_into_ordered_plan() {
        let cfg = LagConfig::default();
        let outcome = decompose(RunId::new("run-2"), COMPLEX_QUERY, COMPLEX_CONTEXT, &cfg).unwrap();
        match outcome {
            DecomposeOutcome::Plan(plan) => {
                assert!(!plan.is_simple());
                assert_eq!(plan.order.len(), plan.sub_questions.len());
            }
            DecomposeOutcome::Terminated(reason) => panic!("expected a plan, got {reason:?}"),
        }
    }

    #[test]
    fn same_input_and_seed_produce_identical_signature() {
        let cfg = LagConfig::default();
        let a = decompose(RunId::new("run-3"), COMPLEX_QUERY, COMPLEX_CONTEXT, &cfg).unwrap();
        let b = decompose(RunId::new("run-3"), COMPLEX_QUERY, COMPLEX_CONTEXT, &cfg).unwrap();
        let (DecomposeOutcome::Plan(plan_a), DecomposeOutcome::Plan(plan_b)) = (a, b) else {
            panic!("expected plans");
        };
        assert_eq!(plan_a.signature, plan_b.signature);
    }

    #[test]
    fn signature_changes_when_edges_differ_but_order_and_text_do_not() {
        let order = vec![agentflow_core::SubQuestionId::new("sq-1"), agentflow_core::SubQuestionId::new("sq-2")];
        let sub_questions = vec![
            SubQ {
                id: order[0].clone(),
                text: "alpha".to_string(),
                parent_id: None,
                estimated_complexity: 0.5,
                termination_checks: Vec::new(),
            },
            SubQ {
                id: order[1].clone(),
                text: "beta".to_string(),
                parent_id: None,
                estimated_complexity: 0.5,
                termination_checks: Vec::new(),
            },
        ];
        let no_edges = agentflow_core::DepGraph::default();
        let mut with_edge = agentflow_core::DepGraph::default();
        with_edge.predecessors.insert(order[1].clone(), vec![order[0].clone()]);

        let sig_no_edges = plan_signature(&order, &no_edges, &sub_questions).unwrap();
        let sig_with_edge = plan_signature(&order, &with_edge, &sub_questions).unwrap();
        assert_ne!(sig_no_edges, sig_with_edge);
    }
}
