//! CLI command implementations.

pub mod get;
pub mod put;
pub mod serve;
pub mod sync;

use kvbridge_protocol::ResourceKind;
use kvbridge_sync::{BridgeConfig, HttpRemote};

/// Parses a resource name given on the command line.
pub fn parse_resource(name: &str) -> Result<ResourceKind, String> {
    name.parse::<ResourceKind>().map_err(|e| e.to_string())
}

fn remote(url: &str) -> Result<HttpRemote, Box<dyn std::error::Error>> {
    Ok(HttpRemote::new(url, BridgeConfig::default().request_timeout)?)
}
