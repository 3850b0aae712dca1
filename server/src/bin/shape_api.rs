use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use firered_core::{DialogueModel, FireRedEngine, GenerationMode};
use server::config::ServerConfig;
use server::{shape, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    let config = ServerConfig::from_env();
    info!(
        model_dir = %config.model_dir.display(),
        device = %config.device,
        "loading dialogue model"
    );

    let engine = FireRedEngine::load(&config.model_dir, GenerationMode::Dialogue, &config.device)
        .with_context(|| {
            format!(
                "failed to load dialogue model from {}",
                config.model_dir.display()
            )
        })?;
    let model: Arc<dyn DialogueModel> = Arc::new(engine);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.bind_addr()))?;
    let app = shape::router(AppState { model, config });

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!("shape API listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
