// agentflow-cli/src/main.rs
// ============================================================================
// Module: AgentFlow CLI Entry Point
// Description: Process composition root: loads configuration, wires every
//              backend crate into an Orchestrator, and serves the HTTP
//              ingress (spec §6).
// Purpose: Provide a single deployable binary for the orchestration core.
// Dependencies: clap, agentflow-core, agentflow-config, agentflow-cache,
//               agentflow-ratelimit, agentflow-rcr, agentflow-store,
//               agentflow-webhook, agentflow-pipeline, tokio
// ============================================================================

//! ## Overview
//! `agentflow serve` is the only subcommand: it loads an
//! [`agentflow_config::OrchestratorConfig`], constructs every backend the
//! orchestrator coordinates, and hands off to [`http::serve`]. Logging
//! follows the example set elsewhere in this codebase: `tracing` events
//! with level controlled by `RUST_LOG`.

// ============================================================================
// SECTION: Imports
// ============================================================================

mod http;
mod role_adapter;
mod secrets;
mod webhook_endpoints;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use agentflow_cache::TieredCache;
use agentflow_config::OrchestratorConfig;
use agentflow_core::Prng;
use agentflow_core::SystemClock;
use agentflow_pipeline::FileArtifactSink;
use agentflow_pipeline::Orchestrator;
use agentflow_ratelimit::BreakerConfig;
use agentflow_ratelimit::CircuitBreakerRegistry;
use agentflow_ratelimit::RateLimiter;
use agentflow_rcr::RcrRouter;
use agentflow_store::SqliteKvStore;
use agentflow_store::SqliteTenancyStore;
use agentflow_store::StoreConfig;
use agentflow_webhook::HmacValidator;
use agentflow_webhook::ReqwestWebhookTransport;
use agentflow_webhook::WebhookDispatcher;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::secrets::EnvSecretSource;
use crate::webhook_endpoints::WebhookEndpointStore;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "agentflow", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Starts the HTTP ingress server.
    Serve(ServeCommand),
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to an `OrchestratorConfig` TOML file. Falls back to the
    /// default resolution rules (env vars, then built-in defaults) when
    /// omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path to the role-execution HTTP backend this process delegates
    /// step execution to.
    #[arg(long, env = "AGENTFLOW_ROLE_ADAPTER_URL")]
    role_adapter_url: String,
    /// Path to a TOML file listing the tenant webhook endpoints the
    /// Finalize stage dispatches to.
    #[arg(long, env = "AGENTFLOW_WEBHOOKS_CONFIG")]
    webhooks_config: Option<PathBuf>,
    /// Path to the `SQLite` database backing the L2 cache tier.
    #[arg(long, env = "AGENTFLOW_CACHE_DB", default_value = "agentflow-cache.sqlite3")]
    cache_db: PathBuf,
    /// Path to the `SQLite` database backing tenancy quota tracking.
    #[arg(long, env = "AGENTFLOW_TENANCY_DB", default_value = "agentflow-tenancy.sqlite3")]
    tenancy_db: PathBuf,
}

/// Top-level CLI error.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] agentflow_config::ConfigError),
    /// A storage backend could not be opened.
    #[error("storage error: {0}")]
    Store(#[from] agentflow_store::StoreError),
    /// The webhook endpoints file could not be loaded.
    #[error("webhook endpoints error: {0}")]
    WebhookEndpoints(#[from] webhook_endpoints::WebhookEndpointsError),
    /// The role adapter could not be constructed.
    #[error("role adapter error: {0}")]
    RoleAdapter(#[from] agentflow_core::RoleAdapterError),
    /// The webhook transport could not be constructed.
    #[error("webhook transport error: {0}")]
    WebhookTransport(#[from] agentflow_core::TransportError),
    /// `server.bind_addr` was not a valid socket address, despite passing
    /// config validation (defensive; validation already checks this).
    #[error("invalid bind address: {0}")]
    BindAddr(std::net::AddrParseError),
    /// The HTTP server failed to bind or serve.
    #[error("http server error: {0}")]
    Http(#[from] std::io::Error),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "agentflow exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the global `tracing` subscriber from `RUST_LOG`, defaulting
/// to `info` when unset.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Executes the CLI command dispatcher.
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command: builds every backend dependency, assembles
/// the [`Orchestrator`], and blocks serving the HTTP ingress until shutdown.
async fn command_serve(command: ServeCommand) -> Result<(), CliError> {
    let config = OrchestratorConfig::load(command.config.as_deref())?;

    let clock: Arc<dyn agentflow_core::Clock> = Arc::new(SystemClock);
    let prng = Arc::new(Prng::from_seed(config.seed));

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.max_violations, config.rate_limit.block_duration_s));

    let breaker = CircuitBreakerRegistry::new(BreakerConfig {
        failure_threshold: config.circuit_breaker.failure_threshold,
        minimum_requests: config.circuit_breaker.minimum_requests,
        recovery_timeout_s: config.circuit_breaker.recovery_timeout_s,
        half_open_probe_count: config.circuit_breaker.half_open_probe_count,
        success_threshold: config.circuit_breaker.success_threshold,
    });

    let cache_store = Arc::new(SqliteKvStore::open(&StoreConfig::at(command.cache_db.clone()))?);
    let cache = Arc::new(TieredCache::new(config.cache.l1_max_items, config.cache.l1_max_mb, Some(Arc::clone(&cache_store) as Arc<dyn agentflow_core::KvStore>), None, config.cache.base_ttl_s));

    let router = Arc::new(RcrRouter::with_kv(Arc::clone(&clock), Arc::clone(&cache_store) as Arc<dyn agentflow_core::KvStore>));

    let webhook_transport: Arc<dyn agentflow_core::WebhookTransport> = Arc::new(ReqwestWebhookTransport::new()?);
    let webhook = Arc::new(WebhookDispatcher::new(webhook_transport, Arc::clone(&clock), Arc::clone(&prng), config.webhook.clone()));

    let tenancy_store: Arc<dyn agentflow_core::TenancyStore> = Arc::new(SqliteTenancyStore::open(&StoreConfig::at(command.tenancy_db), Arc::clone(&clock))?);

    let artifacts = Arc::new(FileArtifactSink::new(config.server.artifacts_root.clone()));

    let role_adapter: Arc<dyn agentflow_core::RoleAdapter> = Arc::new(role_adapter::HttpRoleAdapter::new(command.role_adapter_url)?);

    let orchestrator = Arc::new(Orchestrator::new(config.clone(), clock, prng, rate_limiter, breaker, cache, router, webhook, tenancy_store, artifacts, role_adapter));

    let secrets: Arc<dyn agentflow_core::SecretSource> = Arc::new(EnvSecretSource::new());
    let hmac_validator = Arc::new(HmacValidator::new(secrets, SystemClock, config.hmac.clone()));

    let webhook_endpoints = Arc::new(WebhookEndpointStore::load(command.webhooks_config.as_deref())?);

    let state = http::ServerState::new(orchestrator, PathBuf::from(config.server.artifacts_root.clone()), hmac_validator, webhook_endpoints);
    let app = http::router(state);

    let addr: SocketAddr = config.server.bind_addr.parse().map_err(CliError::BindAddr)?;
    http::serve(addr, app).await?;
    Ok(())
}
