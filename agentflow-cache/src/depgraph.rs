// agentflow-cache/src/depgraph.rs
// ============================================================================
// Module: Cache Dependency Graph
// Description: Many-to-many key dependency tracking for cascade invalidation.
// Purpose: Let invalidating one key cascade, one level, to every key that
//          consumed it, without embedding pointers in cached values.
// Dependencies: agentflow-core
// ============================================================================

//! ## Overview
//! A cache entry's `dependencies` are the keys it was derived from (forward
//! edges). This graph stores the reverse: for each dependency, which keys
//! depend on it. `Invalidate(k)` walks the reverse edges from `k` to find
//! cascade candidates, then stops — cascades are one level deep to avoid
//! loops, matching the durable-store invariant this process does not own
//! transactionally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;

use agentflow_core::CacheKey;

// ============================================================================
// SECTION: DependencyGraph
// ============================================================================

/// Reverse-edge index from a dependency key to the keys that depend on it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// `dependency -> {dependents}`.
    reverse: HashMap<CacheKey, HashSet<CacheKey>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `key` depends on every key in `dependencies`.
    pub fn record(&mut self, key: &CacheKey, dependencies: &[CacheKey]) {
        for dependency in dependencies {
            self.reverse.entry(dependency.clone()).or_default().insert(key.clone());
        }
    }

    /// Returns every key that directly depends on `key`.
    #[must_use]
    pub fn dependents_of(&self, key: &CacheKey) -> Vec<CacheKey> {
        self.reverse.get(key).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    /// Removes `key` from the graph entirely: its own dependent set and any
    /// edge pointing to it from another key's dependent set.
    pub fn remove(&mut self, key: &CacheKey) {
        self.reverse.remove(key);
        for dependents in self.reverse.values_mut() {
            dependents.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn dependents_are_found_after_record() {
        let mut graph = DependencyGraph::new();
        graph.record(&CacheKey::new("derived"), &[CacheKey::new("base")]);
        let dependents = graph.dependents_of(&CacheKey::new("base"));
        assert_eq!(dependents, vec![CacheKey::new("derived")]);
    }

    #[test]
    fn remove_clears_forward_and_reverse_edges() {
        let mut graph = DependencyGraph::new();
        graph.record(&CacheKey::new("derived"), &[CacheKey::new("base")]);
        graph.remove(&CacheKey::new("derived"));
        assert!(graph.dependents_of(&CacheKey::new("base")).is_empty());
    }
}
