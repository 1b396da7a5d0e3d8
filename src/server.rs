//! MCP-over-HTTP endpoint: `GET /health` and `POST /mcp`.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use esxi_vsphere::tools::catalog;
use esxi_vsphere::{EsxiService, EsxiServiceState, ToolDispatcher};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::protocol::{
    CallToolParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
};

pub const SERVER_NAME: &str = "esxi-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the id handed out on `initialize`.
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Answers JSON-RPC requests on top of the tool dispatcher.
#[derive(Clone)]
pub struct McpHandler {
    dispatcher: ToolDispatcher,
}

impl McpHandler {
    pub fn new(service: EsxiServiceState) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(service),
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Handle one message. Notifications get no response.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = req.id.clone() else {
            debug!(method = %req.method, "Notification received");
            return None;
        };

        let outcome = match req.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": catalog() })),
            "tools/call" => self.call_tool(req.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params for tools/call"))?;
        let call: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")))?;

        info!(tool = %call.name, "Tool call");
        let response = self.dispatcher.dispatch(&call.name, call.arguments).await;
        serde_json::to_value(response).map_err(|e| {
            JsonRpcError::new(crate::protocol::INTERNAL_ERROR, format!("Serialization failed: {e}"))
        })
    }
}

// ── HTTP ────────────────────────────────────────────────────────────

pub fn create_router(handler: McpHandler) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/mcp", post(mcp_endpoint))
        .with_state(Arc::new(handler))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION
    }))
}

async fn mcp_endpoint(State(handler): State<Arc<McpHandler>>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Malformed JSON-RPC body");
            let resp = JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(e));
            return (StatusCode::BAD_REQUEST, Json(resp)).into_response();
        }
    };

    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let req: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "Invalid JSON-RPC request");
            let resp = JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e));
            return (StatusCode::BAD_REQUEST, Json(resp)).into_response();
        }
    };

    let is_initialize = req.method == "initialize";
    match handler.handle(req).await {
        None => StatusCode::ACCEPTED.into_response(),
        Some(resp) => {
            let mut response = Json(resp).into_response();
            if is_initialize {
                let session_id = uuid::Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&session_id) {
                    response.headers_mut().insert(SESSION_ID_HEADER, value);
                }
            }
            response
        }
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────

/// Serve until `shutdown` resolves, then close the ESXi session.
pub async fn serve<F>(listener: TcpListener, handler: McpHandler, shutdown: F) -> Result<(), BoxError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = handler.dispatcher().service().clone();
    axum::serve(listener, create_router(handler))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped, closing ESXi session");
    service.disconnect().await;
    Ok(())
}

/// Build the service from config, bind, and serve until Ctrl-C / SIGTERM.
pub async fn start_server(config: &AppConfig) -> Result<(), BoxError> {
    let service = EsxiService::new(&config.esxi)?.into_state();
    let esxi = service.get_config().clone();
    let handler = McpHandler::new(service);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        esxi = %esxi.host,
        user = %esxi.username,
        insecure = esxi.insecure,
        "MCP server listening"
    );

    serve(listener, handler, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
