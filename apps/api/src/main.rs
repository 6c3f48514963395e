mod config;
mod errors;
mod generation;
mod llm_client;
mod models;
mod routes;
mod safety;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::orchestrator::GenerationOrchestrator;
use crate::generation::pipeline::GenerationPipeline;
use crate::generation::prompts::SAFETY_PREAMBLE_VERSION;
use crate::generation::store::InMemoryArtifactStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::safety::fabrication::FabricationValidator;
use crate::safety::sanitize::InputSanitizer;
use crate::state::AppState;

/// Headroom over the per-attempt timeout so the orchestrator's timer fires first.
const HTTP_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let policy = config.retry_policy();
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        policy.timeout + HTTP_TIMEOUT_HEADROOM,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build the safety pipeline
    let orchestrator = GenerationOrchestrator::new(Arc::new(llm), policy);
    let pipeline = GenerationPipeline::new(
        InputSanitizer::new(config.max_input_chars),
        orchestrator,
        FabricationValidator::new(config.fabrication_match),
    );
    info!(
        "Generation pipeline ready: timeout={:?}, max_retries={}, backoff_base={:?}, preamble=v{}, fabrication_match={:?}",
        policy.timeout,
        policy.max_retries,
        policy.backoff_base,
        SAFETY_PREAMBLE_VERSION,
        config.fabrication_match
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        store: Arc::new(InMemoryArtifactStore::default()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
