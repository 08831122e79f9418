//! Get command implementation.

use kvbridge_protocol::ResourceKind;
use kvbridge_sync::RemoteStore;
use serde::Serialize;
use serde_json::Value;

/// Result of fetching one resource.
#[derive(Debug, Serialize)]
pub struct GetResult {
    /// Resource name.
    pub resource: String,
    /// Token reported by the store.
    pub token: Option<u64>,
    /// Wire body.
    pub body: Value,
}

/// Fetches a resource and prints it.
pub async fn run(
    remote_url: &str,
    kind: ResourceKind,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let remote = super::remote(remote_url)?;
    let snapshot = remote.get(kind).await?;

    let result = GetResult {
        resource: kind.name().to_string(),
        token: snapshot.token.map(|t| t.as_millis()),
        body: snapshot.value.to_wire(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("Resource: {}", result.resource);
            match result.token {
                Some(token) => println!("Token:    {token}"),
                None => println!("Token:    (none)"),
            }
            println!("{}", serde_json::to_string_pretty(&result.body)?);
        }
    }
    Ok(())
}
