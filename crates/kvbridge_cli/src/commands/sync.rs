//! Sync command implementation.
//!
//! Runs a bridge over a JSON file store so a local key space can be kept in
//! step with a remote store from the terminal.

use kvbridge_protocol::ResourceKind;
use kvbridge_storage::JsonFileStore;
use kvbridge_sync::{BridgeConfig, SyncBridge};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Mirrors `remote_url` into the file at `store_path`.
///
/// With `once` set, pulls every resource a single time and exits; otherwise
/// polls until Ctrl-C and flushes pending pushes before returning.
pub async fn run(
    remote_url: &str,
    store_path: &Path,
    interval: Duration,
    timeout: Duration,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(JsonFileStore::open_with_create_dirs(store_path)?);
    let config = BridgeConfig::new()
        .with_pull_interval(interval)
        .with_request_timeout(timeout);
    let bridge = SyncBridge::connect(config, store, remote_url)?;

    if once {
        for (kind, outcome) in bridge.pull_all().await {
            println!("{:<8} {:?}", kind.name(), outcome);
        }
        return Ok(());
    }

    let handle = bridge.start();
    info!(remote = remote_url, store = %store_path.display(), "sync running");
    tokio::signal::ctrl_c().await?;
    handle.stop();

    for (kind, outcome) in bridge.flush_all().await {
        info!(resource = kind.name(), ?outcome, "flushed pending push");
    }

    let stats = bridge.stats();
    if stats.pushes_failed > 0 || stats.pulls_failed > 0 {
        warn!(
            pushes_failed = stats.pushes_failed,
            pulls_failed = stats.pulls_failed,
            "sync finished with failures"
        );
    }
    println!(
        "Pushes: {} sent, {} accepted, {} adopted, {} failed",
        stats.pushes_sent, stats.pushes_accepted, stats.pushes_adopted, stats.pushes_failed
    );
    println!(
        "Pulls:  {} applied, {} unchanged, {} skipped, {} failed",
        stats.pulls_applied, stats.pulls_unchanged, stats.pulls_skipped, stats.pulls_failed
    );
    for kind in ResourceKind::ALL {
        println!("{:<8} token {}", kind.name(), bridge.local_token(kind));
    }
    Ok(())
}
