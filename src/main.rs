use anyhow::{Context, Result};
use line_translator::{config::Config, line::AppState, server};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("line_translator=info".parse()?),
        )
        .init();

    info!("Starting LINE translation bot");

    let config = Config::from_env()?;
    info!(
        "Primary model: {}, secondary provider: {}",
        config.openai_model,
        if config.deepl_api_key.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let state = Arc::new(AppState::from_config(&config));
    let app = server::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
