//! Wayfarer Engine - experience runtime server.
//!
//! Serves location-based AR / text-adventure experiences over WebSocket and
//! HTTP, backed by atomic JSON documents on disk and an OpenAI-compatible
//! LLM provider for markdown-defined commands.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer_engine::app::App;
use wayfarer_engine::gateway;
use wayfarer_engine::infrastructure::{EngineConfig, OpenAiCompatClient, TrustedTokenVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wayfarer Engine");

    let config = EngineConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Data root: {}", config.data_root.display());
    tracing::info!("  LLM: {} ({})", config.llm_base_url, config.llm_model);

    let llm = Arc::new(OpenAiCompatClient::new(
        &config.llm_base_url,
        &config.llm_model,
        config.llm_timeout_secs,
    ));
    let verifier = Arc::new(TrustedTokenVerifier);

    let server_port = config.server_port;
    let app = Arc::new(App::new(config, llm, verifier));
    tracing::info!("Application state initialized");

    let router = gateway::router(app)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
