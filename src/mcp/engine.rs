//! The JSON-RPC protocol engine.
//!
//! Reads one request object per line from the input stream, dispatches it and
//! writes exactly one response object for every request that carries an `id`.
//! Unparseable lines are skipped so intermittent garbage from a host never
//! aborts the loop; objects without an `id` are notifications and produce no
//! response. The loop ends cleanly on input EOF or when the cancellation
//! token is tripped.

use crate::error::{BridgeError, BridgeResult, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
use crate::mcp::protocol::{InitializeResult, JsonRpcResponse, ToolCallResult};
use crate::mcp::registry::{ToolArguments, ToolRegistry};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ProtocolEngine {
    registry: Arc<ToolRegistry>,
    /// Set by a successful `initialize`; gates `tools/list` and `tools/call`.
    initialized: bool,
}

impl ProtocolEngine {
    /// Create an engine over a tool registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            initialized: false,
        }
    }

    /// Run the request loop until EOF, cancellation or a fatal I/O error.
    ///
    /// Responses are written in request order; the peer is expected to wait
    /// for each response before sending the next request.
    pub async fn run<R, W>(
        &mut self,
        token: CancellationToken,
        mut reader: R,
        mut writer: W,
    ) -> BridgeResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Cancellation requested, stopping request loop");
                    return Ok(());
                }
                read = reader.read_line(&mut line) => read,
            };
            let bytes = read
                .map_err(|e| BridgeError::internal(format!("failed to read request: {e}")))?;
            if bytes == 0 {
                info!("Input closed, stopping request loop");
                return Ok(());
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable request");
                    continue;
                }
            };
            let Some(request) = request.as_object() else {
                debug!("Skipping non-object request");
                continue;
            };

            // No id member means the object is a notification; it is never
            // answered.
            let Some(id) = request.get("id").cloned() else {
                let method = request.get("method").and_then(Value::as_str).unwrap_or("");
                debug!(method, "Ignoring notification");
                continue;
            };

            let response = self.dispatch(&token, id, request).await;
            let encoded = serde_json::to_string(&response)
                .map_err(|e| BridgeError::internal(format!("failed to encode response: {e}")))?;
            writer
                .write_all(encoded.as_bytes())
                .await
                .map_err(|e| BridgeError::internal(format!("failed to write response: {e}")))?;
            writer
                .write_all(b"\n")
                .await
                .map_err(|e| BridgeError::internal(format!("failed to write response: {e}")))?;
            writer
                .flush()
                .await
                .map_err(|e| BridgeError::internal(format!("failed to flush response: {e}")))?;
        }
    }

    async fn dispatch(
        &mut self,
        token: &CancellationToken,
        id: Value,
        request: &Map<String, Value>,
    ) -> JsonRpcResponse {
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request");
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        debug!(method, "Dispatching request");

        match method {
            "initialize" => {
                self.initialized = true;
                Self::success(id, InitializeResult::current())
            }
            "tools/list" => {
                if !self.initialized {
                    return Self::not_initialized(id);
                }
                let tools = self.registry.get_all();
                Self::success(id, json!({ "tools": tools }))
            }
            "tools/call" => {
                if !self.initialized {
                    return Self::not_initialized(id);
                }
                self.call_tool(token, id, &params).await
            }
            "resources/list" => Self::success(id, json!({ "resources": [] })),
            "prompts/list" => Self::success(id, json!({ "prompts": [] })),
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        }
    }

    async fn call_tool(
        &self,
        token: &CancellationToken,
        id: Value,
        params: &Value,
    ) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "name parameter is required and must be a string",
            );
        };
        let arguments: ToolArguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        info!(tool = name, "Calling tool");
        match self
            .registry
            .execute(token.child_token(), name, arguments)
            .await
        {
            Ok(text) => Self::success(id, ToolCallResult::text(text)),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                JsonRpcResponse::error(id, e.jsonrpc_code(), e.to_string())
            }
        }
    }

    fn success(id: Value, result: impl serde::Serialize) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(
                id,
                crate::error::INTERNAL_ERROR,
                format!("failed to encode result: {e}"),
            ),
        }
    }

    fn not_initialized(id: Value) -> JsonRpcResponse {
        JsonRpcResponse::error(id, INVALID_REQUEST, "Server not initialized")
    }
}
