// agentflow-rcr/src/analysis.rs
// ============================================================================
// Module: Query and Context Analysis
// Description: Text and nested-map heuristics feeding the six role-scoring
//              dimensions.
// Purpose: Turn raw step text and a context bundle into the structured
//          signals `scoring` combines.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `analyze_query` classifies the sub-question's surface form; `analyze_context`
//! walks the (possibly nested) context JSON object to estimate how much extra
//! interpretive burden it adds. Both are pure, deterministic text/structure
//! heuristics, matching the style of `agentflow-lag`'s cognitive-load scoring.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Common words excluded from concept extraction.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "for", "is", "are", "was", "were", "be", "and", "or", "but", "with",
    "that", "this",
];

/// A capability vocabulary a context key can name; also the vocabulary a
/// role's `capabilities` are drawn from.
const KNOWN_CAPABILITIES: &[&str] = &[
    "planning",
    "delegation",
    "verification",
    "fact_check",
    "analysis",
    "comparison",
    "synthesis",
    "summarization",
    "domain_expertise",
    "deep_reasoning",
    "code",
    "legal",
    "medical",
    "financial",
];

/// Keys or substrings indicating a deadline/schedule requirement.
const TEMPORAL_MARKERS: &[&str] = &["deadline", "date", "time", "schedule", "by_when", "due", "expires"];

/// The surface shape a sub-question takes, used for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Asks a direct factual question.
    Interrogative,
    /// Asks for comparison, analysis, or evaluation.
    Analytical,
    /// Asks for new content to be produced.
    Generative,
    /// Asks for a mechanism or reasoning to be explained.
    Explanatory,
    /// Asks for the best of several options.
    Optimization,
    /// Matches none of the above strongly enough.
    General,
}

/// Signals extracted from the sub-question text itself.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    /// Cognitive load already computed upstream by the LAG engine.
    pub complexity: f64,
    /// Fraction of concepts that look domain-specific (long, non-stopword
    /// tokens), in `[0, 1]`.
    pub domain_specificity: f64,
    /// Unique concepts relative to total word count, in `[0, 1]`.
    pub information_density: f64,
    /// Classified surface form.
    pub query_type: QueryType,
    /// Unique, non-stopword concept tokens, sorted for determinism.
    pub concepts: Vec<String>,
}

/// Signals extracted from the (possibly nested) context bundle.
#[derive(Debug, Clone)]
pub struct ContextAnalysis {
    /// How much interpretive context is present, in `[0, 1]`.
    pub richness: f64,
    /// Capability tags inferred from context keys.
    pub required_capabilities: Vec<String>,
    /// Complexity contributed by context nesting, in `[0, 1]`.
    pub complexity: f64,
    /// Whether any key or string value looks deadline/schedule related.
    pub temporal_requirements: bool,
    /// Deepest nesting level observed (0 for a flat or empty map).
    pub nested_levels: usize,
}

/// Returns the lowercase, non-stopword tokens of length > 3 in `text`.
fn concepts_of(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 3 && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Classifies `text` into a [`QueryType`], checked in the priority order
/// below since a question can match more than one vocabulary.
fn classify_query_type(text: &str) -> QueryType {
    let lower = text.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has_any(&["optimize", "maximize", "minimize", "best way", "most efficient"]) {
        QueryType::Optimization
    } else if has_any(&["compare", "analyze", "evaluate", "contrast"]) {
        QueryType::Analytical
    } else if has_any(&["write", "generate", "create", "compose", "draft"]) {
        QueryType::Generative
    } else if has_any(&["why", "explain", "describe", "how does", "how do"]) {
        QueryType::Explanatory
    } else if lower.trim_end().ends_with('?')
        || has_any(&["what", "who", "when", "where", "which", "is ", "does "])
    {
        QueryType::Interrogative
    } else {
        QueryType::General
    }
}

/// Analyzes `step` text, combining it with the `estimated_complexity` the
/// LAG engine already computed for this sub-question.
#[must_use]
pub fn analyze_query(step: &str, estimated_complexity: f64) -> QueryAnalysis {
    let concepts = concepts_of(step);
    let word_count = step.split_whitespace().count().max(1);
    #[allow(clippy::cast_precision_loss, reason = "word/concept counts stay far below f64's exact-integer range")]
    let domain_specificity = (concepts.iter().filter(|c| c.len() >= 7).count() as f64 / word_count as f64).clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss, reason = "word/concept counts stay far below f64's exact-integer range")]
    let information_density = (concepts.len() as f64 / word_count as f64).clamp(0.0, 1.0);

    QueryAnalysis {
        complexity: estimated_complexity.clamp(0.0, 1.0),
        domain_specificity,
        information_density,
        query_type: classify_query_type(step),
        concepts: concepts.into_iter().collect(),
    }
}

/// Counts every key across `value`'s nested object structure and returns the
/// deepest level of object nesting reached (0 for a flat or empty map).
fn walk_context(value: &Value, depth: usize, keys: &mut Vec<String>, max_depth: &mut usize) {
    let Value::Object(map) = value else {
        return;
    };
    *max_depth = (*max_depth).max(depth);
    for (key, nested) in map {
        keys.push(key.to_lowercase());
        walk_context(nested, depth + 1, keys, max_depth);
    }
}

/// Analyzes a (possibly empty or non-object) context bundle.
#[must_use]
pub fn analyze_context(context: &Value) -> ContextAnalysis {
    let mut keys = Vec::new();
    let mut max_depth = 0usize;
    walk_context(context, 0, &mut keys, &mut max_depth);

    #[allow(clippy::cast_precision_loss, reason = "key counts stay far below f64's exact-integer range")]
    let richness = (keys.len() as f64 / 10.0).clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss, reason = "depth stays far below f64's exact-integer range")]
    let complexity = (max_depth as f64 / 5.0).clamp(0.0, 1.0);

    let required_capabilities: Vec<String> =
        keys.iter().filter(|key| KNOWN_CAPABILITIES.contains(&key.as_str())).cloned().collect();

    let context_text = context.to_string().to_lowercase();
    let temporal_requirements = TEMPORAL_MARKERS.iter().any(|marker| keys.iter().any(|k| k == marker) || context_text.contains(marker));

    ContextAnalysis { richness, required_capabilities, complexity, temporal_requirements, nested_levels: max_depth }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn classifies_comparison_as_analytical() {
        let analysis = analyze_query("Compare the GDP of France and Germany", 0.4);
        assert_eq!(analysis.query_type, QueryType::Analytical);
    }

    #[test]
    fn classifies_plain_question_as_interrogative() {
        let analysis = analyze_query("What is the capital of France?", 0.1);
        assert_eq!(analysis.query_type, QueryType::Interrogative);
    }

    #[test]
    fn empty_context_has_zero_richness() {
        let context = serde_json::json!({});
        let analysis = analyze_context(&context);
        assert_eq!(analysis.richness, 0.0);
        assert_eq!(analysis.nested_levels, 0);
        assert!(analysis.required_capabilities.is_empty());
    }

    #[test]
    fn known_capability_key_is_inferred() {
        let context = serde_json::json!({"legal": {"jurisdiction": "EU"}, "deadline": "2026-01-01"});
        let analysis = analyze_context(&context);
        assert!(analysis.required_capabilities.contains(&"legal".to_string()));
        assert!(analysis.temporal_requirements);
        assert_eq!(analysis.nested_levels, 1);
    }
}
