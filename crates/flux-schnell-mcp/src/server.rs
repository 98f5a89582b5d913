// crates/flux-schnell-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: Stdio JSON-RPC 2.0 transport for the Flux Schnell tools.
// Purpose: Frame, dispatch, and answer MCP requests over stdin/stdout.
// Dependencies: flux-schnell-contract, serde_json, tokio
// ============================================================================

//! ## Overview
//! The MCP server speaks JSON-RPC 2.0 over stdin/stdout with Content-Length
//! framing and always routes calls through [`crate::tools::ToolRouter`].
//! Stdio is the only transport: the server is spawned per client and owns the
//! process lifetime. EOF on stdin is a clean stop; a ctrl-c signal interrupts
//! the serve loop without draining in-flight work. The reader runs on a
//! detached thread that is never joined, so an interrupt exits promptly even
//! while stdin stays open. Inputs are untrusted and must be validated before
//! they reach the upstream gateway.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use flux_schnell_contract::ToolDefinition;
use flux_schnell_contract::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::config::FluxSchnellConfig;
use crate::config::UpstreamCredential;
use crate::gateway::ReplicateClient;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: FluxSchnellConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Metrics sink for request telemetry.
    metrics: Arc<dyn McpMetrics>,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// The upstream credential is resolved from the environment exactly once
    /// here; construction fails before any transport I/O when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config(config: FluxSchnellConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let credential = UpstreamCredential::from_env(&config.upstream.token_env)
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let client = ReplicateClient::from_config(&config.upstream, credential)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let router = ToolRouter::new(Arc::new(client));
        Ok(Self {
            config,
            router,
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Serves requests over stdio until EOF or an interrupt signal.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let max_body_bytes = self.config.server.max_body_bytes;
        let done = spawn_stdio_worker(
            self.router,
            self.metrics,
            std::io::stdin(),
            std::io::stdout(),
            max_body_bytes,
        );
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .map_err(|_| McpServerError::Transport("signal handler failed".to_string()))
        };
        serve_until(done, shutdown).await
    }
}

/// Spawns the stdio serve loop on a detached thread.
///
/// The thread must not be a runtime blocking task: runtime shutdown joins
/// blocking tasks, and a reader parked on stdin would then outlive an
/// interrupt until the client closed the pipe.
fn spawn_stdio_worker<R, W>(
    router: ToolRouter,
    metrics: Arc<dyn McpMetrics>,
    reader: R,
    mut writer: W,
    max_body_bytes: usize,
) -> oneshot::Receiver<Result<(), McpServerError>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let result =
            serve_stdio(&router, metrics.as_ref(), &mut reader, &mut writer, max_body_bytes);
        let _ = done_tx.send(result);
    });
    done_rx
}

/// Races worker completion against a shutdown future.
///
/// A winning shutdown abandons the worker without joining it; the detached
/// thread ends with the process.
async fn serve_until(
    done: oneshot::Receiver<Result<(), McpServerError>>,
    shutdown: impl Future<Output = Result<(), McpServerError>>,
) -> Result<(), McpServerError> {
    tokio::select! {
        joined = done => {
            joined.map_err(|_| McpServerError::Transport("stdio worker failed".to_string()))?
        }
        result = shutdown => result,
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over framed byte streams until clean EOF.
fn serve_stdio(
    router: &ToolRouter,
    metrics: &dyn McpMetrics,
    reader: &mut BufReader<impl Read>,
    writer: &mut impl Write,
    max_body_bytes: usize,
) -> Result<(), McpServerError> {
    loop {
        let Some(bytes) = read_framed(reader, max_body_bytes)? else {
            return Ok(());
        };
        let started = Instant::now();
        let (method, tool, response) = match serde_json::from_slice::<JsonRpcRequest>(&bytes) {
            Ok(request) => handle_request(router, request),
            Err(_) => (
                McpMethod::Invalid,
                None,
                error_response(Value::Null, -32600, "invalid json-rpc request".to_string()),
            ),
        };
        let payload = serde_json::to_vec(&response)
            .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
        write_framed(writer, &payload)?;
        let event = McpMetricEvent {
            method,
            tool,
            outcome: if response.error.is_none() { McpOutcome::Ok } else { McpOutcome::Error },
            error_code: response.error.as_ref().map(|err| err.code),
            request_bytes: bytes.len(),
            response_bytes: payload.len(),
        };
        metrics.record_request(event.clone());
        metrics.record_latency(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text tool output carrying serialized JSON.
    Text {
        /// Serialized payload.
        text: String,
    },
}

/// Dispatches a JSON-RPC request to the tool router.
fn handle_request(
    router: &ToolRouter,
    request: JsonRpcRequest,
) -> (McpMethod, Option<ToolName>, JsonRpcResponse) {
    if request.jsonrpc != "2.0" {
        return (
            McpMethod::Invalid,
            None,
            error_response(request.id, -32600, "invalid json-rpc version".to_string()),
        );
    }
    match request.method.as_str() {
        "tools/list" => {
            let tools = router.list_tools();
            let response = match serde_json::to_value(ToolListResult {
                tools,
            }) {
                Ok(value) => success_response(request.id, value),
                Err(_) => jsonrpc_error(request.id, &ToolError::Serialization),
            };
            (McpMethod::ToolsList, None, response)
        }
        "tools/call" => {
            let id = request.id;
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    let tool = ToolName::parse(&call.name);
                    let response = match router.handle_tool_call(&call.name, call.arguments) {
                        Ok(result) => tool_call_response(id, &result),
                        Err(err) => jsonrpc_error(id, &err),
                    };
                    (McpMethod::ToolsCall, tool, response)
                }
                Err(_) => (
                    McpMethod::ToolsCall,
                    None,
                    error_response(id, -32602, "invalid tool params".to_string()),
                ),
            }
        }
        _ => (
            McpMethod::Other,
            None,
            error_response(request.id, -32601, "method not found".to_string()),
        ),
    }
}

/// Builds the success envelope for a tool call result.
///
/// The upstream prediction payload is re-serialized verbatim as the text
/// content; callers can parse the text back into the exact upstream JSON.
fn tool_call_response(id: Value, result: &Value) -> JsonRpcResponse {
    let Ok(text) = serde_json::to_string_pretty(result) else {
        return jsonrpc_error(id, &ToolError::Serialization);
    };
    match serde_json::to_value(ToolCallResult {
        content: vec![ToolContent::Text {
            text,
        }],
    }) {
        Ok(value) => success_response(id, value),
        Err(_) => jsonrpc_error(id, &ToolError::Serialization),
    }
}

/// Builds a JSON-RPC success response.
fn success_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC error response from raw code and message.
fn error_response(id: Value, code: i64, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message,
        }),
    }
}

/// Builds a JSON-RPC error response for a tool failure.
fn jsonrpc_error(id: Value, error: &ToolError) -> JsonRpcResponse {
    let (code, message) = match error {
        ToolError::UnknownTool => (-32601, "unknown tool".to_string()),
        ToolError::InvalidParams(message) => (-32602, message.clone()),
        ToolError::Upstream(message) | ToolError::Internal(message) => (-32603, message.clone()),
        ToolError::Serialization => (-32603, "serialization failed".to_string()),
    };
    error_response(id, code, message)
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `Ok(None)` on EOF before any header byte, which is the clean
/// client-disconnect case.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if saw_header {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        saw_header = true;
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
