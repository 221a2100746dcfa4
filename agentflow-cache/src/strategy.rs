// agentflow-cache/src/strategy.rs
// ============================================================================
// Module: Cache Strategy Presets
// Description: Named tier subsets and TTL multipliers for cacheable
//              boundaries.
// Purpose: Let callers pick "plan cache" or "step-result cache" without
//          repeating tier and TTL wiring at every call site.
// Dependencies: none
// ============================================================================

//! ## Overview
//! A strategy picks which tiers participate and scales the tier's default
//! TTL. Plans are cheap to recompute but expensive to look wrong, so they
//! get a short multiplier and only the fast tiers; step results are
//! expensive to recompute, so they get the durable tier and a longer TTL.

// ============================================================================
// SECTION: Imports
// ============================================================================

// ============================================================================
// SECTION: CacheTier
// ============================================================================

/// A participating cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CacheTier {
    /// In-process LRU+TTL.
    L1,
    /// Remote KV with TTL.
    L2,
    /// Durable record with TTL and access counters.
    L3,
}

// ============================================================================
// SECTION: CacheStrategy
// ============================================================================

/// A named tier subset and TTL multiplier.
#[derive(Debug, Clone)]
pub struct CacheStrategy {
    /// Tiers probed in order on `get`, and written on `put`.
    pub tiers: Vec<CacheTier>,
    /// Multiplier applied to each tier's base TTL.
    pub ttl_multiplier: f64,
}

impl CacheStrategy {
    /// Plan cache: fast tiers only, short-lived (plans are cheap to
    /// recompute but drive the rest of a run, so staleness is undesirable).
    #[must_use]
    pub fn plan() -> Self {
        Self {
            tiers: vec![CacheTier::L1, CacheTier::L2],
            ttl_multiplier: 0.5,
        }
    }

    /// Step-result cache: every tier, long-lived (step results are the
    /// expensive thing to recompute).
    #[must_use]
    pub fn step_result() -> Self {
        Self {
            tiers: vec![CacheTier::L1, CacheTier::L2, CacheTier::L3],
            ttl_multiplier: 2.0,
        }
    }

    /// Routing-metrics cache: L1 only, very short-lived.
    #[must_use]
    pub fn routing_metrics() -> Self {
        Self {
            tiers: vec![CacheTier::L1],
            ttl_multiplier: 0.25,
        }
    }

    /// Returns true when `tier` participates in this strategy.
    #[must_use]
    pub fn includes(&self, tier: CacheTier) -> bool {
        self.tiers.contains(&tier)
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn plan_strategy_excludes_l3() {
        let strategy = CacheStrategy::plan();
        assert!(!strategy.includes(CacheTier::L3));
        assert!(strategy.includes(CacheTier::L1));
    }

    #[test]
    fn step_result_strategy_includes_every_tier() {
        let strategy = CacheStrategy::step_result();
        assert!(strategy.includes(CacheTier::L1));
        assert!(strategy.includes(CacheTier::L2));
        assert!(strategy.includes(CacheTier::L3));
    }
}
