// agentflow-ratelimit/src/lib.rs
// ============================================================================
// Crate: agentflow-ratelimit
// Description: Admission control (four algorithms, dynamic load scaling,
//              violation tracking) and per-target circuit breaking.
// Purpose: Back the HTTP ingress boundary and role-adapter call sites with
//          the rate-limiting and failure-isolation contracts.
// Dependencies: agentflow-core, tokio
// ============================================================================

//! # agentflow-ratelimit
//!
//! `RateLimiter` answers `Admit(clientId, limits)` under a selectable
//! algorithm; `CircuitBreakerRegistry` tracks per-target health and fails
//! fast while a dependency is unhealthy.

pub mod algorithm;
pub mod breaker;
pub mod errors;
pub mod limiter;
pub mod state;

pub use algorithm::Algorithm;
pub use algorithm::Limits;
pub use breaker::Admission;
pub use breaker::BreakerConfig;
pub use breaker::CircuitBreakerRegistry;
pub use breaker::CircuitState;
pub use errors::RateLimitError;
pub use limiter::RateLimiter;
pub use state::AdmissionResult;
