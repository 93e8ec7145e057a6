//! Pagecraft server
//!
//! Entry point for the chat-driven page authoring service.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use pagecraft::config::AppConfig;
use pagecraft::{server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = Arc::new(AppConfig::load()?);

    telemetry::init(config.logging.json);
    tracing::debug!(config = ?config, "Configuration loaded");

    server::start_server(config).await
}
