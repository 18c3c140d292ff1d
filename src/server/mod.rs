// MCP server - serves the tool catalog and tool calls over stdio JSON-RPC
//
// - Host spawns this process and talks over stdin/stdout (newline-delimited JSON)
// - Protocol: initialize → notifications/initialized → tools/list → tools/call
// - stdout carries protocol messages only; logging goes to stderr

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::tools::{catalog, ToolDispatcher, ToolRequest};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC request or notification (notifications carry no id)
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response structure
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Stdio MCP server over a shared dispatcher
pub struct McpServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read line by line from `reader`, writing responses to `writer`.
    ///
    /// Tool calls run concurrently in their own tasks; a single writer task owns
    /// the output so responses never interleave mid-line.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tracing::info!("MCP server listening on stdio");

        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            anyhow::Ok(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("Failed to parse request: {}", e);
                    let _ = tx.send(JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                }
            };

            tracing::debug!("Received request: {} (id={:?})", request.method, request.id);
            self.handle(request, &tx);
        }

        // Close our sender; in-flight tool tasks hold clones until they reply.
        drop(tx);
        writer_task.await??;

        tracing::info!("MCP server shutting down");
        Ok(())
    }

    fn handle(&self, request: JsonRpcRequest, tx: &mpsc::UnboundedSender<JsonRpcResponse>) {
        let Some(id) = request.id else {
            // Notifications such as notifications/initialized get no reply
            tracing::debug!("Notification: {}", request.method);
            return;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": catalog() })),
            "tools/call" => {
                let request = match parse_tool_call(request.params) {
                    Ok(r) => r,
                    Err(message) => {
                        let _ = tx.send(JsonRpcResponse::error(id, INVALID_PARAMS, message));
                        return;
                    }
                };

                let dispatcher = self.dispatcher.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = dispatcher.call(request).await;
                    let response = match serde_json::to_value(result) {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
                    };
                    let _ = tx.send(response);
                });
                return;
            }
            other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };

        let _ = tx.send(response);
    }
}

fn parse_tool_call(params: Option<Value>) -> std::result::Result<ToolRequest, String> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| format!("Invalid tools/call params: {e}"))?;

    tracing::info!("Tool call: {}", params.name);
    ToolRequest::from_call(&params.name, params.arguments).map_err(|e| e.to_string())
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
