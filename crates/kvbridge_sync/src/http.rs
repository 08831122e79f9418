//! HTTP transport backed by `reqwest`.

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteStore;
use async_trait::async_trait;
use kvbridge_protocol::{
    ChangeTimestamp, PutOutcome, ResourceKind, ResourceValue, Snapshot, SYNC_TS_HEADER,
};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Talks to a remote store over its REST surface (`/api/<resource>`).
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Creates a transport for the store at `base_url` (e.g. `http://host:7070`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport_fatal(format!("failed to build client: {e}")))?;
        Ok(Self::with_client(base_url, client))
    }

    /// Creates a transport over an existing client.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }
}

fn header_token(headers: &HeaderMap) -> Option<ChangeTimestamp> {
    headers
        .get(SYNC_TS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

fn network_error(context: &str, err: reqwest::Error) -> SyncError {
    SyncError::Transport {
        message: format!("{context}: {err}"),
        retryable: err.is_timeout() || err.is_connect(),
    }
}

async fn read_json(response: Response) -> SyncResult<Value> {
    response
        .json()
        .await
        .map_err(|e| SyncError::Protocol(format!("invalid response body: {e}")))
}

async fn status_error(response: Response) -> SyncError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    if status >= 500 {
        SyncError::Server { status, message }
    } else {
        SyncError::Rejected { status, message }
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn get(&self, kind: ResourceKind) -> SyncResult<Snapshot> {
        let response = self
            .client
            .get(self.url(kind))
            .send()
            .await
            .map_err(|e| network_error("get failed", e))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let token = header_token(response.headers());
        let body = read_json(response).await?;
        Ok(Snapshot::new(ResourceValue::from_wire(kind, &body), token))
    }

    async fn put(
        &self,
        kind: ResourceKind,
        value: &ResourceValue,
        token: ChangeTimestamp,
    ) -> SyncResult<PutOutcome> {
        let response = self
            .client
            .put(self.url(kind))
            .header(SYNC_TS_HEADER, token.to_string())
            .json(&value.to_wire())
            .send()
            .await
            .map_err(|e| network_error("put failed", e))?;

        let status = response.status();
        let header = header_token(response.headers());

        if status == StatusCode::CONFLICT {
            let body = read_json(response).await?;
            return Ok(PutOutcome::Conflict(Snapshot::new(
                ResourceValue::from_wire(kind, &body),
                header,
            )));
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let body_token = read_json(response)
            .await
            .ok()
            .and_then(|body| body.get("ts").and_then(Value::as_u64))
            .map(ChangeTimestamp::from_millis);
        Ok(PutOutcome::Accepted {
            token: header.or(body_token).unwrap_or(token),
        })
    }
}
