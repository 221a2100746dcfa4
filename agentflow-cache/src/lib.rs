// agentflow-cache/src/lib.rs
// ============================================================================
// Crate: agentflow-cache
// Description: Tiered result cache (L1 in-process, L2 remote, L3 durable)
//              with dependency-aware cascade invalidation.
// Purpose: Back the pipeline's plan and step-result caching boundaries.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! # agentflow-cache
//!
//! Three cache tiers behind one `get`/`put`/`invalidate` surface, with a
//! strategy preset choosing which tiers participate and how long an entry
//! lives in each.

pub mod depgraph;
pub mod errors;
pub mod l1;
pub mod strategy;
pub mod tiered;

pub use depgraph::DependencyGraph;
pub use errors::CacheError;
pub use l1::L1Cache;
pub use strategy::CacheStrategy;
pub use strategy::CacheTier;
pub use tiered::TieredCache;
