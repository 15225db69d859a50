//! Gemini Chat - a browser chat assistant backed by Google Gemini
//!
//! Each incoming message runs through a one-node conversation graph that
//! picks a fast or a code-capable model and replies over SSE.

mod api;
mod codegen;
mod config;
mod graph;
mod llm;
mod prompts;
mod responder;
mod session;
mod tools;

use api::{create_router, AppState};
use config::Config;
use llm::{ModelRegistry, ModelVariant};
use session::ChatSession;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment is only mutated here, before any runtime thread exists
    dotenvy::dotenv().ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("gemini-chat: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "Configuration loaded");

    // Initialize LLM registry
    let models = Arc::new(ModelRegistry::new(&config)?);
    tracing::info!(
        fast = %models.model_id(ModelVariant::Fast),
        capable = %models.model_id(ModelVariant::Capable),
        "Gemini models configured"
    );

    let graph = Arc::new(responder::conversation_graph(models.clone())?);
    tracing::info!(entry = %graph.entry_point(), "Conversation graph compiled");

    let chat = ChatSession::new(graph, config.thinking_delay);
    let state = AppState::new(&config, models, chat);
    api::spawn_idle_sweeper(state.sessions.clone(), config.session_idle_ttl);

    if config.enable_exec_endpoint {
        tracing::warn!("Python execution endpoint enabled; code runs unsandboxed");
    }

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr();
    tracing::info!("Gemini chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
