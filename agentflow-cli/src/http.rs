// agentflow-cli/src/http.rs
// ============================================================================
// Module: HTTP Ingress
// Description: axum router implementing the orchestration core's HTTP
//              surface (spec §6): run submission, run/artifact retrieval,
//              inbound webhook validation, and health/metrics probes.
// Purpose: The process's one externally reachable surface.
// Dependencies: agentflow-core, agentflow-pipeline, agentflow-webhook, axum,
//               tokio, uuid
// ============================================================================

//! ## Overview
//! `POST /v1/runs` never blocks on orchestration: it allocates a run id,
//! records it `Pending` in an in-memory registry, and spawns
//! `Orchestrator::process` in the background, returning `202` immediately.
//! Callers poll `GET /v1/runs/{id}` for the outcome. Rate-limit, circuit
//! breaker, and tenancy rejections therefore surface as a `Rejected` run
//! record rather than a synchronous `429` on the submission response
//! itself — see DESIGN.md's Open Question decision.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use agentflow_core::CorrelationId;
use agentflow_core::RunId;
use agentflow_core::SystemClock;
use agentflow_core::TenantId;
use agentflow_pipeline::Orchestrator;
use agentflow_webhook::HmacValidator;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::error;
use tracing::info;
use uuid::Uuid;

use crate::webhook_endpoints::WebhookEndpointStore;

/// Outcome recorded against a run id once its background task completes.
enum RunRecord {
    /// Still executing in the background.
    Pending,
    /// Finished, successfully or not; the [`agentflow_core::Run`] itself
    /// carries the terminal status.
    Finished(Box<agentflow_core::Run>),
    /// Rejected before or during processing; the message is operator-safe.
    Rejected(String),
}

/// Shared server state handed to every route.
#[derive(Clone)]
pub struct ServerState {
    orchestrator: Arc<Orchestrator>,
    artifacts_root: PathBuf,
    runs: Arc<RwLock<HashMap<String, RunRecord>>>,
    hmac_validator: Arc<HmacValidator<SystemClock>>,
    webhook_endpoints: Arc<WebhookEndpointStore>,
}

impl ServerState {
    /// Builds the shared server state.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, artifacts_root: PathBuf, hmac_validator: Arc<HmacValidator<SystemClock>>, webhook_endpoints: Arc<WebhookEndpointStore>) -> Self {
        Self { orchestrator, artifacts_root, runs: Arc::new(RwLock::new(HashMap::new())), hmac_validator, webhook_endpoints }
    }
}

/// Builds the full application router.
#[must_use]
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/v1/runs", post(submit_run))
        .route("/v1/runs/{id}", get(get_run))
        .route("/v1/runs/{id}/artifacts/{name}", get(get_artifact))
        .route("/v1/webhooks/inbound/{source}", post(inbound_webhook))
        .route("/health/ready", get(health_ready))
        .route("/health/live", get(health_live))
        .route("/health/metrics", get(health_metrics))
        .with_state(state)
}

// ============================================================================
// SECTION: Run Submission and Retrieval
// ============================================================================

/// `POST /v1/runs` request body. `config` is accepted but not yet
/// actionable: `Orchestrator::process` has no per-request config override,
/// only the config fixed at process startup (see DESIGN.md's Open
/// Question decision).
#[derive(Deserialize)]
struct SubmitRunRequest {
    query: String,
    #[serde(default)]
    context: serde_json::Value,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    correlation_id: Option<String>,
}

/// `POST /v1/runs` response body.
#[derive(Serialize)]
struct SubmitRunResponse {
    run_id: String,
}

/// Header carrying the caller's already-resolved tenant identity. SSO/JWT
/// parsing is out of scope here, so tenant identity is expected to arrive
/// pre-resolved from whatever authenticates the request upstream.
const TENANT_HEADER: &str = "x-tenant-id";

async fn submit_run(State(state): State<ServerState>, headers: HeaderMap, Json(request): Json<SubmitRunRequest>) -> Response {
    let Some(tenant_id) = headers.get(TENANT_HEADER).and_then(|value| value.to_str().ok()).filter(|value| !value.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "InvalidInput", "message": "missing x-tenant-id header"}))).into_response();
    };
    let _ = request.config;
    let run_id = RunId::new(Uuid::new_v4().to_string());
    let tenant_id = TenantId::new(tenant_id);
    let correlation_id = request.correlation_id.map(CorrelationId::new);
    let webhook_endpoints = state.webhook_endpoints.for_tenant(tenant_id.as_str());

    {
        let mut runs = state.runs.write().await;
        runs.insert(run_id.as_str().to_string(), RunRecord::Pending);
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    let runs = Arc::clone(&state.runs);
    let spawned_run_id = run_id.clone();
    let context = request.context;
    let query = request.query;
    tokio::spawn(async move {
        let outcome = orchestrator.process(spawned_run_id.clone(), tenant_id, correlation_id, &query, context, &webhook_endpoints).await;
        let record = match outcome {
            Ok(run) => RunRecord::Finished(Box::new(run)),
            Err(err) => {
                error!(run_id = %spawned_run_id, error = %err, "run processing failed");
                RunRecord::Rejected(err.to_string())
            }
        };
        runs.write().await.insert(spawned_run_id.as_str().to_string(), record);
    });

    (StatusCode::ACCEPTED, Json(SubmitRunResponse { run_id: run_id.as_str().to_string() })).into_response()
}

async fn get_run(State(state): State<ServerState>, Path(run_id): Path<String>) -> Response {
    let runs = state.runs.read().await;
    match runs.get(&run_id) {
        Some(RunRecord::Pending) => (StatusCode::OK, Json(serde_json::json!({"run_id": run_id, "status": "pending"}))).into_response(),
        Some(RunRecord::Finished(run)) => (StatusCode::OK, Json(run.as_ref())).into_response(),
        Some(RunRecord::Rejected(message)) => (StatusCode::OK, Json(serde_json::json!({"run_id": run_id, "status": "rejected", "message": message}))).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "NotFound", "message": "unknown run id"}))).into_response(),
    }
}

async fn get_artifact(State(state): State<ServerState>, Path((run_id, name)): Path<(String, String)>) -> Response {
    if !is_safe_component(&run_id) || !is_safe_component(&name) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "InvalidInput", "message": "invalid run id or artifact name"}))).into_response();
    }
    let path = state.artifacts_root.join(&run_id).join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (StatusCode::OK, bytes).into_response(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "NotFound", "message": "unknown artifact"}))).into_response(),
        Err(err) => {
            error!(run_id = %run_id, name = %name, error = %err, "failed to read artifact");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": "Internal", "message": "failed to read artifact"}))).into_response()
        }
    }
}

/// Rejects path traversal and absolute-path artifact/run identifiers.
fn is_safe_component(component: &str) -> bool {
    !component.is_empty() && component != "." && component != ".." && !component.contains('/') && !component.contains('\\')
}

// ============================================================================
// SECTION: Inbound Webhooks
// ============================================================================

async fn inbound_webhook(State(state): State<ServerState>, Path(source): Path<String>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let header_pairs: Vec<(String, String)> = headers.iter().filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))).collect();
    let secret_path = format!("webhooks:{source}");

    match state.hmac_validator.validate(&secret_path, &header_pairs, &body).await {
        Ok(()) => {
            info!(source = %source, "accepted inbound webhook");
            (StatusCode::OK, Json(serde_json::json!({"status": "accepted"}))).into_response()
        }
        Err(err) => {
            info!(source = %source, error = %err, "rejected inbound webhook");
            (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "Unauthorized", "message": "Invalid webhook signature"}))).into_response()
        }
    }
}

// ============================================================================
// SECTION: Health
// ============================================================================

async fn health_ready() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

async fn health_live() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

async fn health_metrics(State(state): State<ServerState>) -> Response {
    (StatusCode::OK, Json(state.orchestrator.health_snapshot().await)).into_response()
}

/// Binds and serves `router` on `addr` until the process receives a
/// shutdown signal, then drains in-flight requests before returning.
///
/// # Errors
///
/// Returns an I/O error when the listener cannot bind `addr`.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "agentflow http ingress listening");
    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await
}

/// Resolves once the process receives `SIGINT`/`SIGTERM` (or `Ctrl+C` on
/// platforms without the latter), used to drain in-flight requests before
/// exit per the shutdown requirement.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}
