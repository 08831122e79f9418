//! Serve command implementation.

use kvbridge_server::{ServerConfig, SyncServer};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

/// Runs the reference remote store until Ctrl-C.
pub async fn run(
    bind: IpAddr,
    port: u16,
    max_body_bytes: usize,
    advisory: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::new(SocketAddr::new(bind, port))
        .with_max_body_bytes(max_body_bytes)
        .with_enforce_tokens(!advisory);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    if advisory {
        info!("token checks are advisory; stale writes will be stored");
    }

    let server = Arc::new(SyncServer::new(config));
    kvbridge_server::serve(server, listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;
    Ok(())
}
