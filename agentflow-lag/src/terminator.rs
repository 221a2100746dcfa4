// agentflow-lag/src/terminator.rs
// ============================================================================
// Module: Terminator Checks
// Description: Pure predicate functions for each termination condition,
//              evaluated before a step executes and after its output is
//              inspected.
// Purpose: Give the pipeline one place to ask "should this run stop, and
//          why", with the first triggered condition winning.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! Checks are ordered by [`TerminationReason`] declaration order when
//! evaluated through [`check_all_pre_execution`] / [`check_all_post_output`]:
//! the first one that fires wins and the rest are not evaluated, per the
//! "first triggered condition wins" rule.

use agentflow_core::StepStatus;
use agentflow_core::TerminationReason;

const UNANSWERABLE_MARKERS: &[&str] = &[
    "i don't know",
    "cannot determine",
    "insufficient information",
    "unable to answer",
    "no information available",
];
const CONTRADICTION_MARKERS: &[&str] = &["contradicts", "inconsistent with", "conflicts with"];

/// `RECURSION_LIMIT`: the plan's layer depth exceeds `max_depth`.
#[must_use]
pub fn check_recursion_limit(depth: usize, max_depth: u32) -> Option<TerminationReason> {
    (depth > max_depth as usize).then_some(TerminationReason::RecursionLimit)
}

/// `REDUNDANCY_DETECTED`: two sub-questions normalize to the same text.
#[must_use]
pub fn check_redundancy(texts: &[String]) -> Option<TerminationReason> {
    let mut seen = std::collections::HashSet::new();
    for text in texts {
        let normalized = text.trim().to_lowercase();
        if !seen.insert(normalized) {
            return Some(TerminationReason::RedundancyDetected);
        }
    }
    None
}

/// `DEPENDENCY_FAILURE`: any predecessor step did not complete
/// successfully.
#[must_use]
pub fn check_dependency_failure(predecessor_statuses: &[StepStatus]) -> Option<TerminationReason> {
    predecessor_statuses
        .iter()
        .any(|status| matches!(status, StepStatus::Failed | StepStatus::Skipped))
        .then_some(TerminationReason::DependencyFailure)
}

/// Pre-execution terminators, in priority order. Evaluated before a step's
/// role adapter is invoked.
#[must_use]
pub fn check_all_pre_execution(depth: usize, max_depth: u32, sub_question_texts: &[String], predecessor_statuses: &[StepStatus]) -> Option<TerminationReason> {
    check_recursion_limit(depth, max_depth)
        .or_else(|| check_redundancy(sub_question_texts))
        .or_else(|| check_dependency_failure(predecessor_statuses))
}

/// `UNANSWERABLE`: the output explicitly disclaims an answer.
#[must_use]
pub fn check_unanswerable(output: &str) -> Option<TerminationReason> {
    let lower = output.to_lowercase();
    UNANSWERABLE_MARKERS.iter().any(|marker| lower.contains(marker)).then_some(TerminationReason::Unanswerable)
}

/// `CONTRADICTION`: the output explicitly flags disagreement with prior
/// evidence.
#[must_use]
pub fn check_contradiction(output: &str) -> Option<TerminationReason> {
    let lower = output.to_lowercase();
    CONTRADICTION_MARKERS.iter().any(|marker| lower.contains(marker)).then_some(TerminationReason::Contradiction)
}

/// `LOW_SUPPORT`: the role adapter reported no supporting evidence.
#[must_use]
pub fn check_low_support(evidence_count: usize) -> Option<TerminationReason> {
    (evidence_count == 0).then_some(TerminationReason::LowSupport)
}

/// `CONFIDENCE_THRESHOLD`: reported confidence fell below the configured
/// minimum.
#[must_use]
pub fn check_confidence_threshold(confidence: f64, threshold: f64) -> Option<TerminationReason> {
    (confidence < threshold).then_some(TerminationReason::ConfidenceThreshold)
}

/// Post-output terminators, in priority order. Evaluated after a step's
/// role adapter returns.
#[must_use]
pub fn check_all_post_output(output: &str, evidence_count: usize, confidence: f64, confidence_threshold: f64) -> Option<TerminationReason> {
    check_unanswerable(output)
        .or_else(|| check_contradiction(output))
        .or_else(|| check_low_support(evidence_count))
        .or_else(|| check_confidence_threshold(confidence, confidence_threshold))
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn recursion_limit_fires_past_max_depth() {
        assert_eq!(check_recursion_limit(6, 5), Some(TerminationReason::RecursionLimit));
        assert_eq!(check_recursion_limit(5, 5), None);
    }

    #[test]
    fn redundancy_fires_on_duplicate_normalized_text() {
        let texts = vec!["What is X".to_string(), " what is x ".to_string()];
        assert_eq!(check_redundancy(&texts), Some(TerminationReason::RedundancyDetected));
    }

    #[test]
    fn unanswerable_marker_is_detected() {
        assert_eq!(check_unanswerable("I don't know based on the given context."), Some(TerminationReason::Unanswerable));
        assert_eq!(check_unanswerable("Paris is the capital of France."), None);
    }

    #[test]
    fn confidence_below_threshold_fires() {
        assert_eq!(check_confidence_threshold(0.5, 0.75), Some(TerminationReason::ConfidenceThreshold));
        assert_eq!(check_confidence_threshold(0.9, 0.75), None);
    }

    #[test]
    fn first_triggered_condition_wins() {
        let reason = check_all_post_output("i don't know, and this contradicts the prior finding", 0, 0.1, 0.75);
        assert_eq!(reason, Some(TerminationReason::Unanswerable));
    }
}
