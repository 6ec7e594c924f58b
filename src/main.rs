use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mayhem::config::ServerConfig;
use mayhem::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let bind_address = config.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind to {bind_address}"))?;

    match &config.client_origin {
        Some(origin) => info!("CORS configured for: {}", origin),
        None => info!("CORS open to any origin"),
    }

    server::serve(listener, &config).await?;
    Ok(())
}
