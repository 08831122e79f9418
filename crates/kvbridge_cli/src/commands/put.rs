//! Put command implementation.

use kvbridge_protocol::{ChangeTimestamp, PutOutcome, ResourceKind, ResourceValue};
use kvbridge_sync::RemoteStore;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Reads a wire body from `file`, or stdin when absent.
pub fn read_body(
    kind: ResourceKind,
    file: Option<&Path>,
) -> Result<ResourceValue, Box<dyn std::error::Error>> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let body: Value = serde_json::from_str(&text)?;
    Ok(ResourceValue::validate_wire(kind, &body)?)
}

/// Writes a resource and reports the outcome.
pub async fn run(
    remote_url: &str,
    kind: ResourceKind,
    file: Option<&Path>,
    token: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_body(kind, file)?;
    let remote = super::remote(remote_url)?;

    match remote
        .put(kind, &value, ChangeTimestamp::from_millis(token))
        .await?
    {
        PutOutcome::Accepted { token } => println!("Accepted, token {token}"),
        PutOutcome::Conflict(snapshot) => {
            let stored = snapshot.token.unwrap_or_default();
            println!("Rejected: stored token {stored} is newer than {token}");
            println!("{}", serde_json::to_string_pretty(&snapshot.value.to_wire())?);
        }
    }
    Ok(())
}
