// agentflow-pipeline/src/pipeline.rs
// ============================================================================
// Module: Orchestration Pipeline (C8)
// Description: Binds Preflight, Plan, Execute, Verify, and Finalize (spec
//              §4.3) over the LAG engine, RCR router, tiered cache, rate
//              limiter, circuit breaker, and webhook dispatcher.
// Purpose: The crate's one entry point: `Process(query, context) -> Run`.
// Dependencies: agentflow-core, agentflow-config, agentflow-lag,
//               agentflow-rcr, agentflow-cache, agentflow-ratelimit,
//               agentflow-webhook, tokio
// ============================================================================

//! ## Overview
//! `Orchestrator::process` walks a run through five stages. Preflight admits
//! the request (rate limit, circuit breaker, tenancy quota) and opens a
//! [`Run`]. Plan decomposes the query through `agentflow_lag::decompose`.
//! Execute walks the plan's parallel groups, bounding fan-out within a group
//! with a semaphore, consulting the cache before each step and the LAG
//! terminator checks before and after each role-adapter call. Verify checks
//! the run's overall confidence. Finalize writes the run's artifacts and
//! fires a webhook event. A terminator firing is a normal outcome recorded
//! on the returned [`Run`], not an `Err`: only preflight rejection, backend
//! failure, or an internal invariant violation produce an `Err`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agentflow_cache::CacheStrategy;
use agentflow_cache::TieredCache;
use agentflow_config::OrchestratorConfig;
use agentflow_core::CacheKey;
use agentflow_core::Clock;
use agentflow_core::CorrelationId;
use agentflow_core::Plan;
use agentflow_core::Prng;
use agentflow_core::Role;
use agentflow_core::RoleAdapter;
use agentflow_core::RoleAdapterError;
use agentflow_core::RoleName;
use agentflow_core::RoleRequest;
use agentflow_core::Run;
use agentflow_core::RunId;
use agentflow_core::RunStatus;
use agentflow_core::StepId;
use agentflow_core::StepStatus;
use agentflow_core::SubQ;
use agentflow_core::SubQuestionId;
use agentflow_core::TenancyStore;
use agentflow_core::TenantId;
use agentflow_core::TerminationReason;
use agentflow_core::WebhookEndpoint;
use agentflow_core::canonical_roles;
use agentflow_lag::engine::DecomposeOutcome;
use agentflow_lag::engine::decompose;
use agentflow_lag::terminator::check_all_pre_execution;
use agentflow_lag::terminator::check_all_post_output;
use agentflow_ratelimit::Algorithm;
use agentflow_ratelimit::CircuitBreakerRegistry;
use agentflow_ratelimit::Limits;
use agentflow_ratelimit::RateLimiter;
use agentflow_rcr::RcrRouter;
use agentflow_rcr::RoutingRequirements;
use agentflow_webhook::WebhookDispatcher;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::artifacts::FileArtifactSink;
use crate::errors::PipelineError;
use crate::metrics::StabilityTracker;
use crate::signature;
use crate::tenancy::TenancyContext;
use crate::trace::TraceRecord;

/// Token budget granted to every step's role-adapter call. The spec leaves
/// per-role budgets unspecified; a flat value keeps routing decisions
/// independent of token accounting.
const STEP_TOKEN_BUDGET: u64 = 4_096;

/// Upper bound on concurrent role-adapter calls within one parallel group,
/// derived from the smallest canonical role's `load_capacity`
/// ([`canonical_roles`]: `specialist`, capacity 3) so a group can never
/// oversubscribe the most constrained role regardless of which roles its
/// steps are eventually routed to.
fn max_group_concurrency() -> usize {
    canonical_roles().into_iter().map(|role: Role| role.load_capacity as usize).min().unwrap_or(1).max(1)
}

/// Dependency name used for the circuit breaker guarding role-adapter calls.
const ROLE_POOL_TARGET: &str = "role_pool";

/// Binds every orchestration dependency behind the five-stage pipeline.
pub struct Orchestrator {
    config: OrchestratorConfig,
    clock: Arc<dyn Clock>,
    prng: Arc<Prng>,
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreakerRegistry>,
    cache: Arc<TieredCache>,
    router: Arc<RcrRouter>,
    webhook: Arc<WebhookDispatcher>,
    tenancy: TenancyContext,
    artifacts: Arc<FileArtifactSink>,
    role_adapter: Arc<dyn RoleAdapter>,
    stability: StabilityTracker,
}

impl Orchestrator {
    /// Builds an orchestrator over every backend it coordinates.
    #[allow(clippy::too_many_arguments, reason = "binds one dependency per spec §4.3 component; a builder would only move the list, not shorten it")]
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
        prng: Arc<Prng>,
        rate_limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreakerRegistry>,
        cache: Arc<TieredCache>,
        router: Arc<RcrRouter>,
        webhook: Arc<WebhookDispatcher>,
        tenancy_store: Arc<dyn TenancyStore>,
        artifacts: Arc<FileArtifactSink>,
        role_adapter: Arc<dyn RoleAdapter>,
    ) -> Self {
        Self {
            config,
            clock,
            prng,
            rate_limiter,
            breaker,
            cache,
            router,
            webhook,
            tenancy: TenancyContext::new(tenancy_store),
            artifacts,
            role_adapter,
            stability: StabilityTracker::new(),
        }
    }

    /// Runs the full `Process(query, context) -> Run` contract.
    ///
    /// `webhook_endpoints` is the tenant's already-provisioned endpoint
    /// list; provisioning itself is out of scope here (see
    /// [`crate::tenancy`]).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when preflight rejects the request or a
    /// backend fails outright. A terminator firing mid-run is recorded on
    /// the returned [`Run`]'s status, not raised as an error.
    pub async fn process(self: &Arc<Self>, run_id: RunId, tenant_id: TenantId, correlation_id: Option<CorrelationId>, query: &str, context: serde_json::Value, webhook_endpoints: &[WebhookEndpoint]) -> Result<Run, PipelineError> {
        let mut run = self.preflight(run_id.clone(), tenant_id, correlation_id, query).await?;
        self.append_trace(&run.run_id, &TraceRecord::RunStarted { at: run.started_at }).await;

        run.status = RunStatus::Planning;
        let context_digest = signature::context_digest(&context).map_err(|err| PipelineError::from(agentflow_core::OrchestratorError::Internal(err.to_string())))?;
        let context_str = context.to_string();

        let outcome = decompose(run.run_id.clone(), query, &context_str, &self.config.lag)?;
        let plan = match outcome {
            DecomposeOutcome::Terminated(reason) => {
                return self.halt(run, None, reason).await;
            }
            DecomposeOutcome::Plan(plan) => plan,
        };

        self.write_artifact(&run.run_id, "preflight_plan.json", serde_json::to_vec(&plan).unwrap_or_default()).await;
        self.append_trace(&run.run_id, &TraceRecord::PlanEmitted { signature: plan.signature.clone(), sub_question_count: plan.sub_questions.len(), depth: plan.depth() }).await;
        run.step_count = plan.sub_questions.len();

        run.status = RunStatus::Executing;
        match self.execute(&run, &plan, &context, &context_digest).await? {
            ExecuteOutcome::Completed { confidences, token_total } => {
                run.token_total = token_total;
                self.verify(&mut run, &confidences).await;
            }
            ExecuteOutcome::Terminated { step_id, reason } => {
                return self.halt(run, Some(step_id), reason).await;
            }
            ExecuteOutcome::Failed { message } => {
                run.status = RunStatus::Failed;
                self.append_trace(&run.run_id, &TraceRecord::RunFailed { at: self.clock.now(), reason: message }).await;
            }
        }

        self.finalize(&mut run, webhook_endpoints).await;
        Ok(run)
    }

    /// Preflight: admission (rate limit, circuit breaker, tenancy quota)
    /// and run initialization.
    async fn preflight(&self, run_id: RunId, tenant_id: TenantId, correlation_id: Option<CorrelationId>, query: &str) -> Result<Run, PipelineError> {
        let now = self.clock.now();

        let limits = Limits { capacity: self.config.rate_limit.burst, rate_per_min: self.config.rate_limit.rpm, window_s: 60, limit: self.config.rate_limit.rpm };
        let admission = self.rate_limiter.admit(tenant_id.as_str(), Algorithm::TokenBucket, limits, None, now).await;
        if !admission.allowed {
            return Err(PipelineError::from(agentflow_core::OrchestratorError::RateLimited { retry_after_ms: admission.retry_after.unwrap_or(1) * 1_000 }));
        }

        if self.breaker.check(ROLE_POOL_TARGET, now).await == agentflow_ratelimit::Admission::Rejected {
            return Err(PipelineError::from(agentflow_core::OrchestratorError::CircuitOpen { dependency: ROLE_POOL_TARGET.to_string() }));
        }

        let decision = self.tenancy.admit_run(tenant_id.as_str()).await?;
        if !decision.admitted {
            return Err(PipelineError::from(agentflow_core::OrchestratorError::RateLimited { retry_after_ms: 0 }));
        }

        let config_snapshot = self.config.snapshot_hash().map_err(|err| PipelineError::from(agentflow_core::OrchestratorError::Internal(err.to_string())))?;

        let artifacts_path = format!("{}/{}", self.config.server.artifacts_root, run_id.as_str());
        Ok(Run {
            run_id,
            tenant_id,
            correlation_id,
            seed: self.config.seed,
            temperature: self.config.temperature,
            query: query.to_string(),
            status: RunStatus::Pending,
            started_at: now,
            completed_at: None,
            step_count: 0,
            token_total: 0,
            config_snapshot,
            artifacts_path,
        })
    }

    /// Execute: walks the plan's parallel groups with bounded fan-out.
    async fn execute(self: &Arc<Self>, run: &Run, plan: &Plan, context: &serde_json::Value, context_digest: &agentflow_core::HashDigest) -> Result<ExecuteOutcome, PipelineError> {
        let by_id: HashMap<SubQuestionId, SubQ> = plan.sub_questions.iter().map(|subq| (subq.id.clone(), subq.clone())).collect();
        let mut statuses: HashMap<SubQuestionId, StepStatus> = HashMap::new();
        let mut confidences = Vec::new();
        let mut token_total = 0u64;
        let semaphore = Arc::new(Semaphore::new(max_group_concurrency()));
        let step_timeout_ms = (self.config.lag.timeout_ms / plan.sub_questions.len().max(1) as u64).max(1);

        for group in &plan.parallel_groups {
            let mut handles = Vec::with_capacity(group.len());
            for step_id in group {
                let Some(subq) = by_id.get(step_id) else {
                    continue;
                };
                let predecessor_statuses: Vec<StepStatus> = plan.depgraph.predecessors_of(step_id).iter().filter_map(|pred| statuses.get(pred).copied()).collect();

                let this = Arc::clone(self);
                let subq = subq.clone();
                let run_id = run.run_id.clone();
                let context = context.clone();
                let context_digest = context_digest.clone();
                let permit = Arc::clone(&semaphore);
                let depth = plan.depth();

                handles.push(tokio::spawn(async move {
                    let _permit = permit.acquire_owned().await;
                    this.execute_step(run_id, subq, context, context_digest, depth, predecessor_statuses, step_timeout_ms).await
                }));
            }

            for handle in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => StepOutcome::failed_message(format!("step task panicked: {join_err}")),
                };
                for record in &outcome.trace {
                    self.append_trace(&run.run_id, record).await;
                }
                statuses.insert(outcome.sub_question_id.clone(), outcome.status);
                if let Some(confidence) = outcome.confidence {
                    confidences.push(confidence);
                }
                token_total += outcome.tokens_used;

                if let Some(reason) = outcome.terminator {
                    return Ok(ExecuteOutcome::Terminated { step_id: outcome.step_id, reason });
                }
                if outcome.status == StepStatus::Failed {
                    return Ok(ExecuteOutcome::Failed { message: outcome.error.unwrap_or_else(|| "step failed".to_string()) });
                }
            }
        }

        Ok(ExecuteOutcome::Completed { confidences, token_total })
    }

    /// Executes one step: pre-execution terminator check, cache lookup,
    /// routing, role-adapter call with retry, and post-output terminator
    /// check.
    async fn execute_step(&self, run_id: RunId, subq: SubQ, context: serde_json::Value, context_digest: agentflow_core::HashDigest, depth: usize, predecessor_statuses: Vec<StepStatus>, step_timeout_ms: u64) -> StepOutcome {
        let step_id = StepId::new(subq.id.as_str());
        let mut trace = Vec::new();

        if let Some(reason) = check_all_pre_execution(depth, self.config.lag.max_depth, std::slice::from_ref(&subq.text), &predecessor_statuses) {
            trace.push(TraceRecord::TerminatorTriggered { step_id: Some(step_id.clone()), reason });
            return StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Skipped, confidence: None, tokens_used: 0, error: None, terminator: Some(reason), trace };
        }

        let cache_key = signature::step_signature(subq.id.as_str(), &subq.text, &context_digest, self.config.seed);
        if let Some(cached) = self.cache_get(&cache_key).await {
            trace.push(TraceRecord::StepCompleted { step_id: step_id.clone(), tokens_used: cached.tokens_used, confidence: cached.confidence, from_cache: true });
            return StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Completed, confidence: Some(cached.confidence), tokens_used: cached.tokens_used, error: None, terminator: None, trace };
        }

        let routing = match self.router.route(run_id.clone(), step_id.clone(), &subq.text, subq.estimated_complexity, &context, RoutingRequirements::default()).await {
            Ok(decision) => decision,
            Err(err) => {
                trace.push(TraceRecord::StepFailed { step_id: step_id.clone(), attempts: 0, message: err.to_string() });
                return StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Failed, confidence: None, tokens_used: 0, error: Some(err.to_string()), terminator: None, trace };
            }
        };
        trace.push(TraceRecord::RouteDecision { step_id: step_id.clone(), role: routing.selected_role.clone(), score: routing.normalized_score, fallback: routing.fallback_mode });

        let max_attempts = self.config.lag.max_retries + 1;
        let mut last_error = String::new();
        let mut timed_out = false;

        for attempt in 1..=max_attempts {
            trace.push(TraceRecord::StepStarted { step_id: step_id.clone(), attempt });
            let request = RoleRequest { role: routing.selected_role.clone(), input: subq.text.clone(), token_budget: STEP_TOKEN_BUDGET, temperature: self.config.temperature };
            let deadline = Duration::from_millis(step_timeout_ms);
            let call = tokio::time::timeout(deadline, self.role_adapter.execute(request)).await;

            match call {
                Err(_elapsed) => {
                    timed_out = true;
                    last_error = format!("step timed out after {step_timeout_ms}ms");
                    break;
                }
                Ok(Err(RoleAdapterError::TimedOut { elapsed_ms })) => {
                    timed_out = true;
                    last_error = format!("role adapter timed out after {elapsed_ms}ms");
                    break;
                }
                Ok(Err(RoleAdapterError::CallFailed(message))) => {
                    last_error = message;
                    self.breaker.record(ROLE_POOL_TARGET, false, self.clock.now()).await;
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = crate::retry::step_backoff_delay(attempt, step_timeout_ms, &self.prng);
                    trace.push(TraceRecord::RetryScheduled { step_id: step_id.clone(), next_attempt: attempt + 1, delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX) });
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Ok(Ok(response)) => {
                    self.breaker.record(ROLE_POOL_TARGET, true, self.clock.now()).await;
                    let evidence_count = estimate_evidence_count(&response.output);
                    if let Some(reason) = check_all_post_output(&response.output, evidence_count, response.confidence, self.config.lag.confidence_threshold) {
                        trace.push(TraceRecord::TerminatorTriggered { step_id: Some(step_id.clone()), reason });
                        self.router.release(&routing.selected_role).await;
                        return StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Failed, confidence: Some(response.confidence), tokens_used: response.tokens_used, error: None, terminator: Some(reason), trace };
                    }

                    self.router.release(&routing.selected_role).await;
                    let cached = CachedStep { tokens_used: response.tokens_used, confidence: response.confidence };
                    self.cache_put(&cache_key, &cached, &step_id, &context_digest).await;
                    trace.push(TraceRecord::StepCompleted { step_id: step_id.clone(), tokens_used: response.tokens_used, confidence: response.confidence, from_cache: false });
                    return StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Completed, confidence: Some(response.confidence), tokens_used: response.tokens_used, error: None, terminator: None, trace };
                }
            }
        }

        self.router.release(&routing.selected_role).await;
        trace.push(TraceRecord::StepFailed { step_id: step_id.clone(), attempts: max_attempts, message: last_error.clone() });
        let _ = timed_out;
        StepOutcome { sub_question_id: subq.id.clone(), step_id, status: StepStatus::Failed, confidence: None, tokens_used: 0, error: Some(last_error), terminator: None, trace }
    }

    /// Verify: the run's minimum observed confidence must clear the
    /// configured threshold.
    async fn verify(&self, run: &mut Run, confidences: &[f64]) {
        let min_confidence = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        if confidences.is_empty() || min_confidence >= self.config.lag.confidence_threshold {
            run.status = RunStatus::Completed;
            self.append_trace(&run.run_id, &TraceRecord::RunCompleted { at: self.clock.now() }).await;
        } else {
            run.status = RunStatus::Failed;
            self.append_trace(&run.run_id, &TraceRecord::RunFailed { at: self.clock.now(), reason: format!("minimum confidence {min_confidence:.3} below threshold {:.3}", self.config.lag.confidence_threshold) }).await;
        }
    }

    /// Records a terminator halt on `run` and writes its artifacts.
    async fn halt(self: &Arc<Self>, mut run: Run, step_id: Option<StepId>, reason: TerminationReason) -> Result<Run, PipelineError> {
        run.status = RunStatus::Terminated;
        self.append_trace(&run.run_id, &TraceRecord::TerminatorTriggered { step_id, reason }).await;
        self.append_trace(&run.run_id, &TraceRecord::RunTerminated { at: self.clock.now(), reason }).await;
        self.finalize(&mut run, &[]).await;
        Ok(run)
    }

    /// Finalize: closes out the run's timestamp, records the stability
    /// sample, writes `router_metrics.json`/`meta_report.md`, and fires a
    /// webhook event.
    async fn finalize(self: &Arc<Self>, run: &mut Run, webhook_endpoints: &[WebhookEndpoint]) {
        run.completed_at = Some(self.clock.now());
        self.stability.record(run.status == RunStatus::Completed);

        let metrics = self.router.metrics_snapshot().await;
        self.write_artifact(&run.run_id, "router_metrics.json", serde_json::to_vec(&metrics).unwrap_or_default()).await;
        self.write_artifact(&run.run_id, "meta_report.md", meta_report(run, self.stability.variance_score()).into_bytes()).await;

        if webhook_endpoints.is_empty() {
            return;
        }
        let event_type = match run.status {
            RunStatus::Completed => "run.completed",
            RunStatus::Terminated => "run.terminated",
            _ => "run.failed",
        };
        let payload = serde_json::json!({
            "run_id": run.run_id.as_str(),
            "tenant_id": run.tenant_id.as_str(),
            "status": format!("{:?}", run.status),
            "step_count": run.step_count,
            "token_total": run.token_total,
        });
        let outcomes = self.webhook.dispatch(event_type, &payload, webhook_endpoints).await;
        for outcome in outcomes {
            if outcome.dead_letter.is_some() {
                warn!(run_id = run.run_id.as_str(), "webhook delivery dead-lettered for run event");
            }
        }
    }

    /// Returns a point-in-time health snapshot for the HTTP ingress's
    /// `/health/metrics` endpoint: router metrics plus this process's
    /// rolling run-stability variance.
    pub async fn health_snapshot(&self) -> serde_json::Value {
        let router_metrics = self.router.metrics_snapshot().await;
        serde_json::json!({
            "router": router_metrics,
            "stability_variance": self.stability.variance_score(),
        })
    }

    /// Reads a step result from the cache, logging and treating any
    /// backend error as a miss per the cache's own error-handling policy.
    async fn cache_get(&self, key: &CacheKey) -> Option<CachedStep> {
        match self.cache.get(key, &CacheStrategy::step_result(), self.clock.now()).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "cache read failed, treating as a miss");
                None
            }
        }
    }

    /// Writes a step result to the cache, logging (never failing the run
    /// on) a backend error.
    async fn cache_put(&self, key: &CacheKey, value: &CachedStep, step_id: &StepId, context_digest: &agentflow_core::HashDigest) {
        let Ok(json) = serde_json::to_value(value) else {
            return;
        };
        let dependency = CacheKey::new(format!("step-input:{}:{}", step_id.as_str(), context_digest.as_str()));
        if let Err(err) = self.cache.put(key, json, vec![dependency], &CacheStrategy::step_result(), self.clock.now()).await {
            warn!(error = %err, "cache write failed");
        }
    }

    /// Appends one trace record to `execution_trace.ndjson`.
    async fn append_trace(&self, run_id: &RunId, record: &TraceRecord) {
        let Ok(line) = record.to_ndjson_line() else {
            return;
        };
        self.write_artifact(run_id, "execution_trace.ndjson", line).await;
    }

    /// Writes an artifact, logging (never failing the run on) a write
    /// failure: artifact durability is best-effort alongside the run
    /// itself, per spec §7's "caching and metrics errors never fail a Run"
    /// posture extended to artifacts.
    async fn write_artifact(&self, run_id: &RunId, name: &str, bytes: Vec<u8>) {
        if let Err(err) = self.artifacts.write_artifact(run_id.as_str(), name, &bytes).await {
            warn!(error = %err, name, "artifact write failed");
        }
    }
}

/// The value cached for a completed step.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CachedStep {
    tokens_used: u64,
    confidence: f64,
}

/// Outcome of running one step to completion, including every trace record
/// produced along the way.
struct StepOutcome {
    sub_question_id: SubQuestionId,
    step_id: StepId,
    status: StepStatus,
    confidence: Option<f64>,
    tokens_used: u64,
    error: Option<String>,
    terminator: Option<TerminationReason>,
    trace: Vec<TraceRecord>,
}

impl StepOutcome {
    /// Builds a failed outcome for a step whose task panicked, with no
    /// identifiable sub-question to attach trace records to.
    fn failed_message(message: String) -> Self {
        Self {
            sub_question_id: SubQuestionId::new("unknown"),
            step_id: StepId::new("unknown"),
            status: StepStatus::Failed,
            confidence: None,
            tokens_used: 0,
            error: Some(message),
            terminator: None,
            trace: Vec::new(),
        }
    }
}

/// The result of running the Execute stage over every parallel group.
enum ExecuteOutcome {
    /// Every step ran to completion (success or a handled, non-fatal
    /// skip); confidences are the per-step reported values.
    Completed { confidences: Vec<f64>, token_total: u64 },
    /// A terminator fired during execution.
    Terminated { step_id: StepId, reason: TerminationReason },
    /// A step exhausted retries without a terminator reason.
    Failed { message: String },
}

/// Heuristic evidence count for `check_low_support`: the number of
/// non-empty sentences in the adapter's output. The role-adapter contract
/// carries no explicit evidence count (see `DESIGN.md`'s Open Question
/// decision), so sentence count stands in as a cheap proxy for "the
/// response said something, rather than nothing."
fn estimate_evidence_count(output: &str) -> usize {
    output.split(['.', '!', '?']).map(str::trim).filter(|sentence| !sentence.is_empty()).count()
}

/// Renders `meta_report.md`'s summary and provenance footer.
fn meta_report(run: &Run, variance_score: f64) -> String {
    let mut report = String::new();
    report.push_str(&format!("# Run {}\n\n", run.run_id.as_str()));
    report.push_str(&format!("- Status: {:?}\n", run.status));
    report.push_str(&format!("- Steps: {}\n", run.step_count));
    report.push_str(&format!("- Tokens: {}\n", run.token_total));
    report.push_str(&format!("- Stability (variance score): {variance_score:.4}\n"));
    report.push_str("\n---\n");
    report.push_str(&format!("Run-ID: {}\n", run.run_id.as_str()));
    if let Some(correlation_id) = &run.correlation_id {
        report.push_str(&format!("Correlation-ID: {}\n", correlation_id.as_str()));
    }
    report.push_str("Agent: agentflow-pipeline\n");
    report.push_str(&format!("Provenance: config_snapshot={}\n", run.config_snapshot.as_str()));
    report
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions.
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agentflow_core::FixedClock;
    use agentflow_core::QuotaDecision;
    use agentflow_core::RoleResponse;
    use agentflow_core::TenancyError;
    use agentflow_core::Timestamp;
    use agentflow_core::TransportError;
    use agentflow_core::TransportResponse;
    use agentflow_core::WebhookTransport;
    use agentflow_ratelimit::BreakerConfig;
    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;

    struct AlwaysAdmits;

    #[async_trait]
    impl TenancyStore for AlwaysAdmits {
        async fn check_and_debit(&self, _tenant_id: &str, _cost: u64) -> Result<QuotaDecision, TenancyError> {
            Ok(QuotaDecision { admitted: true, remaining: 99 })
        }
    }

    struct EchoAdapter;

    #[async_trait]
    impl RoleAdapter for EchoAdapter {
        async fn execute(&self, request: RoleRequest) -> Result<RoleResponse, RoleAdapterError> {
            Ok(RoleResponse { output: format!("answered: {}", request.input), tokens_used: 10, confidence: 0.9 })
        }
    }

    struct NeverCalledTransport;

    #[async_trait]
    impl WebhookTransport for NeverCalledTransport {
        async fn post(&self, _url: &str, _headers: &[(String, String)], _body: Vec<u8>, _timeout_ms: u64) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse { status_code: 200, body: Vec::new() })
        }
    }

    fn orchestrator(dir: &tempfile::TempDir) -> Arc<Orchestrator> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let prng = Arc::new(Prng::from_seed(1));
        let config = OrchestratorConfig::default();
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.max_violations, config.rate_limit.block_duration_s));
        let breaker = CircuitBreakerRegistry::new(BreakerConfig {
            failure_threshold: config.circuit_breaker.failure_threshold,
            minimum_requests: config.circuit_breaker.minimum_requests,
            recovery_timeout_s: config.circuit_breaker.recovery_timeout_s,
            half_open_probe_count: config.circuit_breaker.half_open_probe_count,
            success_threshold: config.circuit_breaker.success_threshold,
        });
        let cache = Arc::new(TieredCache::new(config.cache.l1_max_items, config.cache.l1_max_mb, None, None, config.cache.base_ttl_s));
        let router = Arc::new(RcrRouter::new(Arc::clone(&clock)));
        let webhook = Arc::new(WebhookDispatcher::new(Arc::new(NeverCalledTransport), Arc::clone(&clock), Arc::clone(&prng), config.webhook.clone()));
        let artifacts = Arc::new(FileArtifactSink::new(dir.path()));
        Arc::new(Orchestrator::new(config, clock, prng, rate_limiter, breaker, cache, router, webhook, Arc::new(AlwaysAdmits), artifacts, Arc::new(EchoAdapter)))
    }

    #[tokio::test]
    async fn a_simple_query_completes_with_one_step() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(&dir);
        let run = orchestrator.process(RunId::new("run-1"), TenantId::new("tenant-a"), None, "what is the capital of France", serde_json::json!({}), &[]).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.step_count, 1);
    }

    #[tokio::test]
    async fn an_unanswerable_query_terminates_the_run() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(&dir);
        let run = orchestrator.process(RunId::new("run-2"), TenantId::new("tenant-a"), None, "i don't know, this contradicts everything", serde_json::json!({}), &[]).await.unwrap();
        assert_eq!(run.status, RunStatus::Terminated);
    }
}
