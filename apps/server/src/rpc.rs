//! Stdio JSON-RPC 2.0 tool transport.
//!
//! Messages are newline-delimited JSON. Tool calls run as concurrent
//! tasks so one slow upstream request never blocks the loop; responses
//! are written in completion order, matched to requests by id. On EOF or
//! a shutdown signal, in-flight invocations get a bounded drain window
//! before being aborted.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use lumen_core::Orchestrator;

use crate::tools;

/// How long in-flight invocations may finish after shutdown begins.
const DRAIN_WINDOW: Duration = Duration::from_secs(30);

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

/// JSON-RPC 2.0 response message.
#[derive(Debug, Clone, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0", result: Some(result), error: None, id }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError { code, message: message.into() }),
            id,
        }
    }
}

type SharedStdout = Arc<Mutex<Stdout>>;

/// Runs the stdio transport until EOF or a shutdown signal.
///
/// # Errors
///
/// Returns an error only for unrecoverable stdio failures.
pub async fn serve(orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let started_at = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let stdout: SharedStdout = Arc::new(Mutex::new(tokio::io::stdout()));
    let mut calls: JoinSet<()> = JoinSet::new();

    info!("tool transport ready on stdio");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => {
                        info!("stdin closed, shutting down");
                        break;
                    }
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        handle_line(&line, &orchestrator, started_at, &stdout, &mut calls).await?;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    drain(calls).await;
    Ok(())
}

async fn handle_line(
    line: &str,
    orchestrator: &Arc<Orchestrator>,
    started_at: Instant,
    stdout: &SharedStdout,
    calls: &mut JoinSet<()>,
) -> anyhow::Result<()> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "unparsable message");
            write_response(
                stdout,
                &JsonRpcResponse::failure(None, PARSE_ERROR, format!("parse error: {e}")),
            )
            .await?;
            return Ok(());
        }
    };

    debug!(method = %request.method, "request received");
    match request.method.as_str() {
        "initialize" => {
            write_response(stdout, &JsonRpcResponse::success(request.id, initialize_result()))
                .await?;
        }
        "tools/list" => {
            write_response(stdout, &JsonRpcResponse::success(request.id, tools_list_result()))
                .await?;
        }
        "tools/call" => {
            let Some((name, arguments)) = call_params(request.params) else {
                write_response(
                    stdout,
                    &JsonRpcResponse::failure(
                        request.id,
                        INVALID_PARAMS,
                        "tools/call requires a `name` parameter",
                    ),
                )
                .await?;
                return Ok(());
            };
            let orchestrator = orchestrator.clone();
            let stdout = stdout.clone();
            let id = request.id;
            calls.spawn(async move {
                let envelope =
                    tools::dispatch(&orchestrator, started_at, &name, arguments).await;
                let response = JsonRpcResponse::success(id, envelope);
                if let Err(e) = write_response(&stdout, &response).await {
                    warn!(error = %e, "failed to write tool response");
                }
            });
        }
        "ping" => {
            write_response(stdout, &JsonRpcResponse::success(request.id, json!({}))).await?;
        }
        // Notifications carry no id and expect no answer.
        _ if request.id.is_none() => {}
        method => {
            write_response(
                stdout,
                &JsonRpcResponse::failure(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("unknown method `{method}`"),
                ),
            )
            .await?;
        }
    }
    Ok(())
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {"tools": {}},
        "serverInfo": {
            "name": "lumen-server",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn tools_list_result() -> Value {
    let tools: Vec<Value> = tools::tool_defs()
        .into_iter()
        .map(|def| {
            json!({
                "name": def.name,
                "description": def.description,
                "inputSchema": def.input_schema,
            })
        })
        .collect();
    json!({"tools": tools})
}

fn call_params(params: Option<Value>) -> Option<(String, Value)> {
    let params = params?;
    let name = params.get("name")?.as_str()?.to_string();
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    Some((name, arguments))
}

async fn write_response(stdout: &SharedStdout, response: &JsonRpcResponse) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    let mut stdout = stdout.lock().await;
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Lets in-flight invocations finish within the drain window, then
/// aborts whatever remains.
async fn drain(mut calls: JoinSet<()>) {
    if calls.is_empty() {
        return;
    }
    info!(in_flight = calls.len(), "draining in-flight invocations");
    let all_done = async {
        while calls.join_next().await.is_some() {}
    };
    if tokio::time::timeout(DRAIN_WINDOW, all_done).await.is_err() {
        warn!("drain window elapsed, aborting remaining invocations");
        calls.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_result_shape() {
        let result = initialize_result();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "lumen-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_tools_list_result_shape() {
        let result = tools_list_result();
        let tools = result["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "text_to_image"));
        assert!(tools.iter().any(|t| t["name"] == "server_health"));
        for tool in tools {
            assert!(tool["inputSchema"]["type"] == "object");
        }
    }

    #[test]
    fn test_call_params_extraction() {
        let params = json!({"name": "chat", "arguments": {"messages": []}});
        let (name, arguments) = call_params(Some(params)).unwrap();
        assert_eq!(name, "chat");
        assert_eq!(arguments["messages"], json!([]));
    }

    #[test]
    fn test_call_params_missing_name() {
        assert!(call_params(Some(json!({"arguments": {}}))).is_none());
        assert!(call_params(None).is_none());
    }

    #[test]
    fn test_request_parsing() {
        let request: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "method": "tools/list", "id": 1}"#,
        )
        .unwrap();
        assert_eq!(request.method, "tools/list");
        assert_eq!(request.id, Some(json!(1)));
        assert!(request.params.is_none());
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"ok": true}));
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["jsonrpc"], "2.0");

        let response = JsonRpcResponse::failure(Some(json!(2)), METHOD_NOT_FOUND, "nope");
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
    }
}
