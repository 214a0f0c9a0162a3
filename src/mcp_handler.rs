use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use lotto_lib::{BlobStore, DrawSource};

use crate::use_cases::{ArchiveUseCase, RecommendationUseCase, SyncUseCase};

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id: Some(id.unwrap_or(json!(1))),
        }
    }
}

pub struct MCPHandler<S, B> {
    sync_use_case: Arc<SyncUseCase<S, B>>,
    archive_use_case: Arc<ArchiveUseCase<S, B>>,
    recommendation_use_case: Arc<RecommendationUseCase<S, B>>,
}

impl<S: DrawSource, B: BlobStore> MCPHandler<S, B> {
    pub fn new(
        sync_use_case: Arc<SyncUseCase<S, B>>,
        archive_use_case: Arc<ArchiveUseCase<S, B>>,
        recommendation_use_case: Arc<RecommendationUseCase<S, B>>,
    ) -> Self {
        Self {
            sync_use_case,
            archive_use_case,
            recommendation_use_case,
        }
    }

    /// One JSON-RPC message per line in, one response per line out.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: "Parse error".to_string(),
                            data: Some(json!(e.to_string())),
                        }),
                        id: None,
                    };
                    writeln!(writer, "{}", serde_json::to_string(&error_response)?)?;
                    writer.flush()?;
                    continue;
                }
            };

            let is_notification = request.id.is_none() || request.method.starts_with("notifications/");
            if is_notification {
                if request.method == "notifications/initialized" {
                    info!("🎰 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            writeln!(writer, "{}", serde_json::to_string(&response)?)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.get_tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse::failure(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎰 Initializing lotto-sync server");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto-sync",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, -32602, "Missing params".to_string());
        };

        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(id, -32602, "Missing tool name".to_string());
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> = serde_json::from_value(arguments).unwrap_or_default();

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => JsonRpcResponse::failure(id, -32603, format!("Tool execution error: {}", e)),
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "sync_draws" => self.sync_use_case.sync_draws(arguments).await,
            "import_snapshot" => self.sync_use_case.import_snapshot(arguments).await,
            "archive_status" => self.archive_use_case.archive_status(arguments).await,
            "get_latest_draws" => self.archive_use_case.get_latest_draws(arguments).await,
            "get_draw" => self.archive_use_case.get_draw(arguments).await,
            "recommend_numbers" => self.recommendation_use_case.recommend_numbers(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "sync_draws".to_string(),
                description: "Fetch every draw newer than the local archive, one draw number at a time".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "import_snapshot".to_string(),
                description: "Download the full draws.json snapshot and append the draws missing locally".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "archive_status".to_string(),
                description: "Report the number of stored draws and the latest draw number".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: "get_latest_draws".to_string(),
                description: "Get the most recent stored draws, newest first".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Number of draws to return (default: 10)"
                        }
                    }
                }),
            },
            Tool {
                name: "get_draw".to_string(),
                description: "Get one stored draw by its draw number".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "draw_number": {
                            "type": "integer",
                            "description": "Draw number, starting at 1"
                        }
                    },
                    "required": ["draw_number"]
                }),
            },
            Tool {
                name: "recommend_numbers".to_string(),
                description: "Generate random ticket lines of 6 distinct numbers from 1 to 45".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "sets": {
                            "type": "integer",
                            "description": "Number of lines (default: 5)"
                        }
                    }
                }),
            },
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}
