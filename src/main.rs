//! Room server (default binary).
//!
//! Listens on `TETRIS_ROOMS_HOST:TETRIS_ROOMS_PORT` until the process is
//! terminated. See `ServerConfig::from_env` for every variable.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tetris_rooms::server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        tick_ms = config.tick_period.as_millis() as u64,
        randomizer = ?config.randomizer,
        seed = config.seed,
        "starting room server"
    );

    run_server(config, None).await
}
