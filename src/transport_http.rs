use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::server::Server;
use crate::types::{JsonRpcRequest, McpError};

/// Shared state for the HTTP handler.
pub(crate) struct HttpState {
    server: Server,
    sessions: RwLock<HashSet<String>>,
}

/// Create an Axum router for the MCP server.
///
/// Besides the JSON-RPC endpoint at `/mcp`, the router exposes a plain
/// REST façade: `/health`, `/mcp-info`, `POST /tools/{name}` and
/// `GET /resources/{name}`.
pub fn http_router(server: Server) -> Router {
    let state = Arc::new(HttpState {
        server,
        sessions: RwLock::new(HashSet::new()),
    });

    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(handle_health))
        .route("/healthz", get(handle_health))
        .route("/mcp-info", get(handle_info))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/resources/{name}", get(handle_resource_read))
        .with_state(state)
}

async fn handle_health(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": state.server.name(),
        "version": state.server.version(),
    }))
}

async fn handle_info(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(state.server.info())
}

async fn handle_tool_call(
    State(state): State<Arc<HttpState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let args: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return error_response(&McpError::InvalidArguments(format!(
                    "request body is not valid JSON: {}",
                    e
                )));
            }
        }
    };

    match state.server.call_tool(&name, args).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn handle_resource_read(
    State(state): State<Arc<HttpState>>,
    Path(name): Path<String>,
) -> Response {
    match state.server.read_resource(&name).await {
        Ok(content) => Json(content).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &McpError) -> Response {
    let status = match err {
        McpError::MethodNotFound(_) | McpError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
        McpError::InvalidArguments(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    });
    (status, Json(body)).into_response()
}

async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    // Session management: create on initialize, echo afterwards.
    let session_id = if req.method == "initialize" {
        let id = Uuid::new_v4().to_string();
        state.sessions.write().await.insert(id.clone());
        Some(id)
    } else if let Some(id) = headers.get("mcp-session-id").and_then(|h| h.to_str().ok()) {
        if !state.sessions.read().await.contains(id) {
            // Unknown sessions are still served, for stateless clients.
            tracing::debug!(session_id = id, "request for unknown session");
        }
        Some(id.to_string())
    } else {
        None
    };

    let resp = state.server.handle(req).await;

    // Notification: return 202 with no body.
    if resp.is_notification() {
        return (StatusCode::ACCEPTED, Body::empty()).into_response();
    }

    let mut response = Json(&resp).into_response();

    if let Some(value) = session_id.and_then(|sid| HeaderValue::from_str(&sid).ok()) {
        response.headers_mut().insert("mcp-session-id", value);
    }

    response
}
