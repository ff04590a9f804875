//! HTTP transport
//!
//! JSON-RPC over plain HTTP POST for MCP Inspector and similar clients:
//!
//! - `POST /message` and `POST /mcp`: one JSON-RPC message per request
//! - `GET /health`: liveness and registry summary
//!
//! Methods are routed by hand onto the same [`LoxoneMcpServer`] operations
//! the `rmcp` handler uses, so both transports return identical results.

use crate::error::Result;
use crate::server::{LoxoneMcpServer, SERVER_NAME};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::model::{CallToolRequestParam, ErrorCode, ReadResourceRequestParam};
use rmcp::{ErrorData, ServerHandler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Router with all MCP endpoints
pub fn router(server: LoxoneMcpServer) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/message", post(handle_mcp_message))
        .route("/mcp", post(handle_mcp_message))
        .with_state(server)
}

/// Health check endpoint
async fn health_check(State(server): State<LoxoneMcpServer>) -> Json<Value> {
    let registry = server.registry();
    Json(json!({
        "status": "healthy",
        "service": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "tools": registry.tools().len(),
        "resources": registry.resources().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Handle MCP messages via HTTP POST
async fn handle_mcp_message(
    State(server): State<LoxoneMcpServer>,
    Json(request): Json<Value>,
) -> Response {
    match dispatch(&server, request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn rpc_error(id: Value, error: &ErrorData) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": error})
}

/// Handle one JSON-RPC message; `None` when no reply is due
pub async fn dispatch(server: &LoxoneMcpServer, message: Value) -> Option<Value> {
    let invalid_request = || ErrorData::invalid_request("Invalid Request", None);

    let Some(request) = message.as_object() else {
        return Some(rpc_error(Value::Null, &invalid_request()));
    };

    let id = request.get("id").cloned();
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        // Responses from the client need no reply.
        if request.contains_key("result") || request.contains_key("error") {
            return None;
        }
        return Some(rpc_error(id.unwrap_or(Value::Null), &invalid_request()));
    };
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    debug!(method, "Received MCP message over HTTP");

    if method.starts_with("notifications/") {
        if method == "notifications/initialized" {
            info!("MCP client initialized successfully");
        }
        return None;
    }

    let outcome = route(server, method, params).await;
    let Some(id) = id else {
        debug!(method, "No reply for message without id");
        return None;
    };

    Some(match outcome {
        Ok(result) => rpc_result(id, result),
        Err(error) => {
            warn!(method, code = error.code.0, "Request failed: {}", error.message);
            rpc_error(id, &error)
        }
    })
}

async fn route(
    server: &LoxoneMcpServer,
    method: &str,
    params: Value,
) -> std::result::Result<Value, ErrorData> {
    match method {
        "initialize" => to_json(&server.get_info()),
        "ping" => Ok(json!({})),
        "tools/list" => to_json(&server.tools_list()),
        "tools/call" => {
            let request: CallToolRequestParam = parse_params(params)?;
            let arguments = request.arguments.unwrap_or_default();
            to_json(&server.dispatch_tool(&request.name, &arguments).await)
        }
        "resources/list" => to_json(&server.resources_list()),
        "resources/templates/list" => to_json(&server.resource_templates_list()),
        "resources/read" => {
            let request: ReadResourceRequestParam = parse_params(params)?;
            to_json(&server.dispatch_resource(&request.uri).await?)
        }
        _ => Err(ErrorData::new(
            ErrorCode::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
            None,
        )),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> std::result::Result<T, ErrorData> {
    serde_json::from_value(params)
        .map_err(|e| ErrorData::invalid_params(format!("Invalid params: {e}"), None))
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<Value, ErrorData> {
    serde_json::to_value(value).map_err(|e| ErrorData::internal_error(e.to_string(), None))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(server: LoxoneMcpServer, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HTTP transport listening on {}", listener.local_addr()?);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP transport stopped");
    Ok(())
}
