// agentflow-lag/src/lib.rs
// ============================================================================
// Crate: agentflow-lag
// Description: Logic-Augmented-Generation decomposition: cognitive-load
//              scoring, Cartesian decomposition, dependency ordering, and
//              terminator evaluation.
// Purpose: Turn a query into an ordered, dependency-aware execution plan,
//          or the reason it should not run at all.
// Dependencies: agentflow-core, agentflow-config
// ============================================================================

//! # agentflow-lag
//!
//! [`engine::decompose`] is the entry point: `Decompose(query, cfg) ->
//! PlanResult | TerminationResult`. The supporting modules ([`load`],
//! [`decompose`], [`depgraph`], [`terminator`]) are public so the pipeline
//! crate can reuse the terminator checks against live step output, not just
//! at plan-construction time.

pub mod decompose;
pub mod depgraph;
pub mod engine;
pub mod errors;
pub mod load;
pub mod terminator;

pub use engine::DecomposeOutcome;
pub use engine::decompose as decompose_query;
pub use errors::LagError;
