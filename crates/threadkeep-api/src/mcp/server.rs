//! Line-delimited JSON-RPC tool server over stdin/stdout.
//!
//! Exposes one tool, `ask_gemini`, whose `workspace_id` selects a
//! conversation in the `mcp_history` namespace. Tool failures are reported
//! in-band (`isError: true`) so the calling agent can read them; protocol
//! problems become JSON-RPC errors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use threadkeep_types::chat::{Namespace, SessionKey};

use super::types::{
    CallToolParams, CallToolResult, JsonRpcRequest, JsonRpcResponse, ToolDefinition, INVALID_PARAMS,
    INVALID_REQUEST, MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, SERVER_NAME, SERVER_VERSION,
};
use crate::state::ConcreteChatService;

const ASK_TOOL: &str = "ask_gemini";

#[derive(Debug, Deserialize)]
struct AskArgs {
    prompt: String,
    #[serde(default)]
    workspace_id: Option<String>,
}

pub struct McpServer {
    service: Arc<ConcreteChatService>,
    default_workspace: String,
}

impl McpServer {
    pub fn new(service: Arc<ConcreteChatService>, default_workspace: impl Into<String>) -> Self {
        Self {
            service,
            default_workspace: default_workspace.into(),
        }
    }

    /// Serve until the reader reaches EOF.
    ///
    /// A frame that is not valid UTF-8 is answered with a parse error and
    /// the loop keeps reading.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frame = Vec::new();
        loop {
            frame.clear();
            if reader.read_until(b'\n', &mut frame).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&frame) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding non-UTF-8 frame");
                    Some(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("parse error: {e}"),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }
        tracing::info!("Tool server input closed");
        Ok(())
    }

    /// Handle one frame. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "Notification ignored");
            return None;
        };

        if request.jsonrpc.as_deref() != Some("2.0") {
            return Some(JsonRpcResponse::failure(id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
        }

        tracing::debug!(method = %request.method, "Tool server request");
        Some(match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [ask_tool()] })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
        })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return JsonRpcResponse::failure(id, INVALID_PARAMS, "missing params"),
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("invalid params: {e}")),
        };

        if params.name != ASK_TOOL {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("unknown tool: {}", params.name));
        }

        let args: AskArgs = match serde_json::from_value(params.arguments) {
            Ok(args) => args,
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("invalid arguments: {e}")),
        };

        let result = self.ask(args).await;
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, INVALID_REQUEST, e.to_string()),
        }
    }

    async fn ask(&self, args: AskArgs) -> CallToolResult {
        let workspace = args
            .workspace_id
            .as_deref()
            .unwrap_or(&self.default_workspace);

        let key = match SessionKey::new(Namespace::Mcp, workspace) {
            Ok(key) => key,
            Err(e) => return CallToolResult::error(format!("Error: {e}")),
        };

        match self.service.chat(Some(&key), &args.prompt).await {
            Ok(reply) => CallToolResult::text(reply.text),
            Err(e) => {
                tracing::warn!(session = %key, error = %e, "ask_gemini failed");
                CallToolResult::error(format!("Error: {e}"))
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
    })
}

fn ask_tool() -> ToolDefinition {
    ToolDefinition {
        name: ASK_TOOL,
        description: "Ask Gemini a question. Calls sharing a workspace_id share conversation memory.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": "The question or instruction." },
                "workspace_id": {
                    "type": "string",
                    "description": "Conversation to continue. Defaults to the shared default workspace."
                }
            },
            "required": ["prompt"]
        }),
    }
}
