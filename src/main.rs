mod config;
mod llm;
mod predictor;
mod store;
mod telegram;
mod web;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::store::LogStore;
use crate::web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,botdeck=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Chat model: {}", config.llm.chat_model);
    info!("  Reasoner model: {}", config.llm.reasoner_model);
    info!("  Webhook callback: {}", config.callback_url());
    info!("  User log: {}", config.log.database_path.display());

    let store = LogStore::open(&config.log.database_path)?;

    let port = config.server.port;
    let state = Arc::new(AppState::new(config, store)?);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {}", addr);
    axum::serve(listener, web::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
