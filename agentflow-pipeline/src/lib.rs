// agentflow-pipeline/src/lib.rs
// ============================================================================
// Crate: agentflow-pipeline
// Description: Orchestration Pipeline, Artifact Writer, and Tenancy Context:
//              binds LAG, RCR, the tiered cache, the rate limiter and
//              circuit breaker, and webhook dispatch into the end-to-end
//              run contract.
// Purpose: Give the HTTP ingress one entry point — `Orchestrator::process`
//          — that takes a query and returns a finished `Run`.
// Dependencies: agentflow-core, agentflow-config, agentflow-lag,
//               agentflow-rcr, agentflow-cache, agentflow-ratelimit,
//               agentflow-webhook, tokio
// ============================================================================

//! # agentflow-pipeline
//!
//! `Orchestrator::process` is the crate's one entry point: it admits the
//! request, decomposes the query, executes the resulting plan's steps with
//! caching, routing, retry, and terminator checks, verifies the run's
//! overall confidence, and finalizes by writing artifacts and firing a
//! webhook event. The supporting modules are public so the HTTP ingress
//! crate can construct an `Orchestrator` and inspect a completed `Run`'s
//! trace without reaching back into this crate's internals.

pub mod artifacts;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod signature;
pub mod tenancy;
pub mod trace;

pub use artifacts::FileArtifactSink;
pub use errors::PipelineError;
pub use metrics::StabilityTracker;
pub use pipeline::Orchestrator;
pub use tenancy::TenancyContext;
pub use trace::TraceRecord;
