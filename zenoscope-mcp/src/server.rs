//! MCP server loop
//!
//! Handles MCP protocol communication over stdio: async line-delimited
//! JSON-RPC in, responses out. Tool calls are dispatched sequentially; a
//! tool-level failure is still a JSON-RPC success whose envelope carries
//! `isError`.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::bridge::{ExtensionBridge, GatewayHandle};
use crate::dispatch::{dispatch, ToolRequest};
use crate::error::McpError;
use crate::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolsListResult,
};
use crate::tools::get_tool_definitions;

/// MCP server over stdio
pub struct McpServer<H> {
    bridge: ExtensionBridge<H>,
    initialized: bool,
}

impl<H: GatewayHandle> McpServer<H> {
    pub fn new(bridge: ExtensionBridge<H>) -> Self {
        Self {
            bridge,
            initialized: false,
        }
    }

    /// Recover the bridge after the loop ends (for gateway shutdown)
    pub fn into_bridge(self) -> ExtensionBridge<H> {
        self.bridge
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&mut self) -> Result<(), McpError> {
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();

        info!("MCP server starting");

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }

            debug!(raw = %line, "Received request");

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to parse JSON-RPC request");
                    let response = JsonRpcResponse::error(
                        serde_json::Value::Null,
                        JsonRpcError::new(JsonRpcError::PARSE_ERROR, e.to_string()),
                    );
                    writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                    stdout.flush()?;
                    continue;
                }
            };

            if request.jsonrpc != "2.0" {
                let response = JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::with_data(
                        JsonRpcError::INVALID_REQUEST,
                        "Invalid JSON-RPC version",
                        serde_json::json!({"expected": "2.0", "got": request.jsonrpc}),
                    ),
                );
                writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                stdout.flush()?;
                continue;
            }

            if let Some(response) = self.handle_request(request).await {
                let json = serde_json::to_string(&response)?;
                debug!(raw = %json, "Sending response");
                writeln!(stdout, "{}", json)?;
                stdout.flush()?;
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC request; notifications yield no response
    async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_null();

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "initialized" | "notifications/initialized" => Ok(serde_json::json!({})),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&request.params).await,
            _ => Err(McpError::MethodNotFound(request.method.clone())),
        };

        if is_notification {
            if let Err(e) = result {
                warn!(method = %request.method, error = %e, "Notification handling failed");
            }
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::error(request.id, e.into()),
        })
    }

    fn handle_initialize(&mut self) -> Result<serde_json::Value, McpError> {
        self.initialized = true;
        info!("MCP server initialized");

        let result = InitializeResult::default();
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, McpError> {
        let result = ToolsListResult {
            tools: get_tool_definitions(),
        };
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }

    async fn handle_tools_call(
        &mut self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let name = params["name"]
            .as_str()
            .ok_or_else(|| McpError::InvalidParams("Missing 'name' parameter".into()))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let request = ToolRequest {
            tool_name: name.to_string(),
            arguments,
        };
        let result = dispatch(&self.bridge, request).await;

        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::FakeGateway;

    fn server() -> (McpServer<FakeGateway>, FakeGateway) {
        let gateway = FakeGateway::new();
        let server = McpServer::new(ExtensionBridge::new(gateway.clone()));
        (server, gateway)
    }

    fn rpc(id: serde_json::Value, method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_capabilities() {
        let (mut server, _) = server();

        let response = server
            .handle_request(rpc(serde_json::json!(1), "initialize", serde_json::json!({})))
            .await
            .unwrap();

        assert!(server.initialized);
        let result = response.result.unwrap();
        assert!(result["protocolVersion"].is_string());
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_contains_both_tools() {
        let (mut server, _) = server();

        let response = server
            .handle_request(rpc(serde_json::json!(2), "tools/list", serde_json::json!({})))
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<_> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"discover_zenoh_topics".to_string()));
        assert!(names.contains(&"read_zenoh_topic".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_method_is_protocol_error() {
        let (mut server, _) = server();

        let response = server
            .handle_request(rpc(
                serde_json::json!(3),
                "unknown/method",
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(
            response.error.unwrap().code,
            JsonRpcError::METHOD_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (mut server, _) = server();

        let response = server
            .handle_request(rpc(
                serde_json::Value::Null,
                "notifications/initialized",
                serde_json::json!({}),
            ))
            .await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_success_with_error_envelope() {
        let (mut server, gateway) = server();

        let response = server
            .handle_request(rpc(
                serde_json::json!(4),
                "tools/call",
                serde_json::json!({"name": "nonexistent", "arguments": {}}),
            ))
            .await
            .unwrap();

        // transport-level success; the failure lives inside the envelope
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Unknown tool: nonexistent");
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tools_call_missing_name_is_invalid_params() {
        let (mut server, _) = server();

        let response = server
            .handle_request(rpc(
                serde_json::json!(5),
                "tools/call",
                serde_json::json!({"arguments": {}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_end_to_end_discovery() {
        let (mut server, gateway) = server();
        gateway.respond_enveloped(serde_json::json!({"started": true, "key_expr": "**"}));
        gateway.respond_enveloped(serde_json::json!({
            "discovery_active": true, "topic_count": 0, "topics": [],
        }));

        let response = server
            .handle_request(rpc(
                serde_json::json!(6),
                "tools/call",
                serde_json::json!({"name": "discover_zenoh_topics", "arguments": {}}),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("No Zenoh topics found matching \"**\""));
    }
}
