//! HTTP surface of the remote store.

use crate::error::ServerError;
use crate::server::SyncServer;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use kvbridge_protocol::{ChangeTimestamp, PutOutcome, ResourceKind, SYNC_TS_HEADER};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the router for `GET/PUT /api/{resource}`.
pub fn router(server: Arc<SyncServer>) -> Router {
    let limit = server.config().max_body_bytes;
    Router::new()
        .route("/api/{resource}", get(get_resource).put(put_resource))
        .layer(DefaultBodyLimit::max(limit))
        .layer(middleware::map_response(no_store))
        .with_state(server)
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(
    server: Arc<SyncServer>,
    listener: TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "remote store listening");
    }
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn token_header(token: ChangeTimestamp) -> [(HeaderName, String); 1] {
    [(HeaderName::from_static("x-sync-ts"), token.to_string())]
}

async fn get_resource(
    State(server): State<Arc<SyncServer>>,
    Path(resource): Path<String>,
) -> Result<Response, ServerError> {
    let kind: ResourceKind = resource.parse()?;
    let snapshot = server.handle_get(kind);
    let token = snapshot.token.unwrap_or_default();
    Ok((token_header(token), Json(snapshot.value.to_wire())).into_response())
}

async fn put_resource(
    State(server): State<Arc<SyncServer>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerError> {
    let kind: ResourceKind = resource.parse()?;

    let token = match headers.get(SYNC_TS_HEADER) {
        Some(raw) => {
            let raw = raw
                .to_str()
                .map_err(|_| ServerError::InvalidRequest(format!("invalid {SYNC_TS_HEADER}")))?;
            Some(raw.parse::<ChangeTimestamp>()?)
        }
        None => None,
    };

    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid JSON: {e}")))?;

    match server.handle_put(kind, &body, token)? {
        PutOutcome::Accepted { token } => Ok((
            token_header(token),
            Json(json!({ "ok": true, "ts": token.as_millis() })),
        )
            .into_response()),
        PutOutcome::Conflict(snapshot) => {
            let stored = snapshot.token.unwrap_or_default();
            Ok((
                StatusCode::CONFLICT,
                token_header(stored),
                Json(snapshot.value.to_wire()),
            )
                .into_response())
        }
    }
}
