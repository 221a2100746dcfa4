// agentflow-rcr/src/lib.rs
// ============================================================================
// Crate: agentflow-rcr
// Description: Role-Capability-Response router: six-dimension role scoring,
//              threshold selection, advisory load tracking, rolling metrics.
// Purpose: Decide which canonical role executes a given sub-question.
// Dependencies: agentflow-core, tokio, serde, serde_json
// ============================================================================

//! # agentflow-rcr
//!
//! `RcrRouter::route` is the crate's one entry point: analyze the step and
//! context, score every canonical role on six weighted dimensions, select
//! the best-qualifying role (or fall back to `coordinator`), and record the
//! load and metrics side effects. The supporting modules (`analysis`,
//! `scoring`, `selection`, `load`, `metrics`) are public so a pipeline can
//! inspect intermediate scores for diagnostics without re-running `route`.

pub mod analysis;
pub mod errors;
pub mod load;
pub mod metrics;
pub mod router;
pub mod scoring;
pub mod selection;

pub use analysis::ContextAnalysis;
pub use analysis::QueryAnalysis;
pub use analysis::QueryType;
pub use errors::RcrError;
pub use load::LoadTracker;
pub use metrics::MetricsSnapshot;
pub use metrics::RouterHealth;
pub use metrics::RouterMetrics;
pub use router::RcrRouter;
pub use scoring::RoutingRequirements;
pub use selection::SELECTION_THRESHOLD;
pub use selection::Selection;
pub use selection::select_role;
