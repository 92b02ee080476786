//! Streamable HTTP transport
//!
//! A stateless MCP endpoint: every request is a single POST to `/mcp`
//! carrying one JSON-RPC message. Responses carry a fresh
//! `MCP-Session-Id` header; notifications are accepted with 202 and no
//! body. `/health` reports liveness for orchestrators.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header::HeaderName};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::info;

use super::handler::McpHandler;
use crate::error::rpc_codes;
use crate::protocol::{JsonRpcMessage, JsonRpcResponse};
use crate::{Error, Result};

static SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// Serve the app over HTTP until ctrl-c.
pub async fn serve(handler: McpHandler, port: &str) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(app = %handler.app().name, %addr, "Serving on http");

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| Error::Transport(err.to_string()))
}

/// Build the MCP router. Split out so tests can bind their own listener.
pub fn router(handler: McpHandler) -> Router {
    Router::new()
        .route("/mcp", post(mcp_endpoint))
        .route("/health", get(health))
        .with_state(handler)
}

async fn mcp_endpoint(State(handler): State<McpHandler>, body: Bytes) -> Response {
    let message: JsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            let resp =
                JsonRpcResponse::error(None, rpc_codes::PARSE_ERROR, format!("parse error: {err}"));
            return with_session(Json(resp).into_response());
        }
    };

    match handler.handle_message(message).await {
        Some(response) => with_session(Json(response).into_response()),
        None => with_session(StatusCode::ACCEPTED.into_response()),
    }
}

fn with_session(mut response: Response) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(SESSION_HEADER.clone(), value);
    }
    response
}

async fn health(State(handler): State<McpHandler>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "app": handler.app().name,
        "tools": handler.app().tools.len(),
    }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install ctrl-c handler");
        return;
    }
    info!("Shutdown signal received");
}
