//! WebSocket server for the real-time session hub.

use hub_server::config::Config;
use hub_server::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    tracing::info!(
        addr = %config.socket_addr_string(),
        max_participants = config.max_participants,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "Starting hub-server"
    );

    server::run(config).await
}
