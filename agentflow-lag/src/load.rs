// agentflow-lag/src/load.rs
// ============================================================================
// Module: Cognitive Load Scoring
// Description: The three-component cognitive-load estimate that decides
//              whether a query is decomposed at all.
// Purpose: Give `decompose` a single scalar, `L`, comparable against
//          `cognitive_threshold`.
// Dependencies: agentflow-config
// ============================================================================

//! ## Overview
//! Each component is a crude, deterministic text heuristic rather than a
//! learned model: word/concept/relationship counts for `semantic_scope`,
//! keyword counts for `reasoning_depth`, and pronoun/vague-term counts for
//! `ambiguity`. Determinism matters more here than linguistic precision —
//! the same query must always score the same `L`.

use agentflow_config::ComplexityWeights;

const LOGICAL_OPS: &[&str] = &["if", "then", "because", "therefore", "however", "although"];
const COMPLEXITY_INDICATORS: &[&str] = &["how", "why", "what if", "compare", "analyze", "evaluate"];
const PRONOUNS: &[&str] = &["it", "this", "that", "they", "them", "these", "those", "he", "she"];
const VAGUE_TERMS: &[&str] = &["some", "somehow", "thing", "stuff", "various", "certain", "several"];
const RELATIONSHIP_WORDS: &[&str] = &["and", "or", "but", "while", "whereas", "versus", "with"];
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "for", "is", "are", "was", "were", "be", "and", "or", "but",
];

/// Counts case-insensitive, whole-word occurrences of `needle` in `text`.
fn count_occurrences(text: &str, needle: &str) -> usize {
    let lower = text.to_lowercase();
    if needle.contains(' ') {
        return lower.matches(needle).count();
    }
    lower.split(|c: char| !c.is_alphanumeric()).filter(|word| *word == needle).count()
}

/// Sums occurrence counts of every entry in `vocabulary`.
fn count_vocabulary(text: &str, vocabulary: &[&str]) -> usize {
    vocabulary.iter().map(|word| count_occurrences(text, word)).sum()
}

/// Returns the unique, non-stopword, length > 3 tokens in `text`.
fn unique_concepts(text: &str) -> usize {
    let lower = text.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if word.len() > 3 && !STOPWORDS.contains(&word) {
            seen.insert(word.to_string());
        }
    }
    seen.len()
}

/// `semantic_scope = mean(wordCount/50, uniqueConcepts/10,
/// detectedRelationships/5)`, clipped to `[0, 1]`.
#[must_use]
pub fn semantic_scope(query: &str) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "word/concept counts stay far below f64's exact-integer range")]
    let word_count = query.split_whitespace().count() as f64 / 50.0;
    #[allow(clippy::cast_precision_loss, reason = "word/concept counts stay far below f64's exact-integer range")]
    let unique = unique_concepts(query) as f64 / 10.0;
    #[allow(clippy::cast_precision_loss, reason = "word/concept counts stay far below f64's exact-integer range")]
    let relationships = count_vocabulary(query, RELATIONSHIP_WORDS) as f64 / 5.0;
    ((word_count + unique + relationships) / 3.0).clamp(0.0, 1.0)
}

/// `reasoning_depth = min(1, 0.1·count(logical_ops) + 0.2·count(complexity_indicators))`.
#[must_use]
pub fn reasoning_depth(query: &str) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "keyword counts stay far below f64's exact-integer range")]
    let logical = count_vocabulary(query, LOGICAL_OPS) as f64;
    #[allow(clippy::cast_precision_loss, reason = "keyword counts stay far below f64's exact-integer range")]
    let complexity = count_vocabulary(query, COMPLEXITY_INDICATORS) as f64;
    (0.1 * logical + 0.2 * complexity).min(1.0)
}

/// `ambiguity = min(1, 0.1·count(pronouns in context) + 0.15·count(vague_terms))`.
/// `context` is the caller-supplied prior conversation context, empty when
/// there is none.
#[must_use]
pub fn ambiguity(query: &str, context: &str) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "keyword counts stay far below f64's exact-integer range")]
    let pronouns = count_vocabulary(context, PRONOUNS) as f64;
    #[allow(clippy::cast_precision_loss, reason = "keyword counts stay far below f64's exact-integer range")]
    let vague = count_vocabulary(query, VAGUE_TERMS) as f64;
    (0.1 * pronouns + 0.15 * vague).min(1.0)
}

/// The weighted cognitive-load score `L`, in `[0, 1]`.
#[must_use]
pub fn cognitive_load(query: &str, context: &str, weights: ComplexityWeights) -> f64 {
    let score = weights.semantic_scope * semantic_scope(query)
        + weights.reasoning_depth * reasoning_depth(query)
        + weights.ambiguity * ambiguity(query, context);
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn short_simple_query_has_low_load() {
        let weights = ComplexityWeights::default();
        let load = cognitive_load("What is the capital of France?", "", weights);
        assert!(load < 0.3, "expected low load, got {load}");
    }

    #[test]
    fn multi_clause_comparison_has_higher_load() {
        let weights = ComplexityWeights::default();
        let simple = cognitive_load("What is the capital of France?", "", weights);
        let complex = cognitive_load(
            "Compare the economic policies of Japan and Germany, and analyze how each affects trade, \
             however note that models differ, and evaluate which approach it uses",
            "it depends on this and that",
            weights,
        );
        assert!(complex > simple);
    }

    #[test]
    fn reasoning_depth_caps_at_one() {
        let text = "if then because therefore however although how why compare analyze evaluate ".repeat(5);
        assert_eq!(reasoning_depth(&text), 1.0);
    }

    proptest::proptest! {
        #[test]
        fn cognitive_load_always_stays_in_unit_range(query in ".{0,500}", context in ".{0,500}") {
            let load = cognitive_load(&query, &context, ComplexityWeights::default());
            assert!((0.0..=1.0).contains(&load));
        }
    }
}
