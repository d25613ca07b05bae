use anyhow::Result;
use hostus::config::Config;
use hostus::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Flags override environment variables
    let config = Config::from_env();

    // JSON logs; RUST_LOG wins over LOG_LEVEL when set
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = config.log_level.to_lowercase();
                format!("hostus={},tower_http={}", level, level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        log_level = %config.log_level,
        gbif_base_url = %config.gbif_base_url,
        "starting hostus"
    );

    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
