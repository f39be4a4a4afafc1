//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections.
//! - Upgrades each one to a WebSocket on the configured path.
//! - Hands the upgraded connection to the [`Hub`], which admits it (or
//!   refuses it when full) and spawns its session task.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hub_core::Hub;
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::transport::{self, UpgradePolicy};

/// Run the WebSocket server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, path = %config.ws_path, "Listening");

    let hub = Arc::new(Hub::new(config.hub_config()));
    serve(listener, hub, config.upgrade_policy()).await
}

/// Accept connections on `listener` forever.
pub async fn serve(
    listener: TcpListener,
    hub: Arc<Hub>,
    policy: UpgradePolicy,
) -> anyhow::Result<()> {
    let policy = Arc::new(policy);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };

        let hub = hub.clone();
        let policy = policy.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer_addr, &hub, &policy).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: &Arc<Hub>,
    policy: &UpgradePolicy,
) {
    let socket = match transport::accept(stream, policy).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(%peer_addr, error = %e, "WebSocket upgrade error");
            return;
        }
    };

    match hub.connect(transport::into_handle(socket)).await {
        Ok((player_id, _session)) => {
            tracing::debug!(%peer_addr, %player_id, "Session started");
        }
        Err(e) => {
            tracing::warn!(%peer_addr, error = %e, "Player registration error");
        }
    }
}
