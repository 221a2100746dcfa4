// agentflow-core/src/lib.rs
// ============================================================================
// Crate: agentflow-core
// Description: Shared domain model, identifiers, hashing, clock, errors, and
//              backend interfaces used by every other AgentFlow crate.
// Purpose: Give the cache, rate limiter, LAG engine, RCR router, webhook, and
//          pipeline crates one vocabulary instead of each inventing its own.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, rand,
//               async-trait, time
// ============================================================================

//! # agentflow-core
//!
//! The dependency-free core of the orchestrator: identifiers, the domain
//! model, canonical hashing, the clock/prng abstraction, the shared error
//! type, and the async traits every backend implements. No other AgentFlow
//! crate is a dependency of this one.

#![doc(html_no_source)]

pub mod clock;
pub mod errors;
pub mod hashing;
pub mod ids;
pub mod interfaces;
pub mod model;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::Prng;
pub use clock::SystemClock;
pub use clock::Timestamp;
pub use errors::OrchestratorError;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use ids::CacheKey;
pub use ids::CorrelationId;
pub use ids::DeliveryId;
pub use ids::RoleName;
pub use ids::RunId;
pub use ids::StepId;
pub use ids::SubQuestionId;
pub use ids::TenantId;
pub use ids::WebhookId;
pub use interfaces::ArtifactError;
pub use interfaces::ArtifactSink;
pub use interfaces::KvError;
pub use interfaces::KvStore;
pub use interfaces::QuotaDecision;
pub use interfaces::RoleAdapter;
pub use interfaces::RoleAdapterError;
pub use interfaces::RoleRequest;
pub use interfaces::RoleResponse;
pub use interfaces::SecretError;
pub use interfaces::SecretSource;
pub use interfaces::TenancyError;
pub use interfaces::TenancyStore;
pub use interfaces::TransportError;
pub use interfaces::TransportResponse;
pub use interfaces::WebhookTransport;
pub use model::CacheEntry;
pub use model::DepGraph;
pub use model::Plan;
pub use model::RetryConfig;
pub use model::Role;
pub use model::RoleScore;
pub use model::RoutingDecision;
pub use model::Run;
pub use model::RunStatus;
pub use model::StepExecution;
pub use model::StepStatus;
pub use model::SubQ;
pub use model::TerminationReason;
pub use model::WebhookDelivery;
pub use model::WebhookEndpoint;
pub use model::canonical_roles;
