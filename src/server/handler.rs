//! MCP request dispatch
//!
//! One handler serves both transports: it owns the app and maps each
//! JSON-RPC request to a response. Tool failures at the transport level
//! come back as successful `tools/call` results with `isError` set, so
//! clients can show the model what went wrong.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::app::App;
use crate::error::rpc_codes;
use crate::protocol::{
    Content, Info, InitializeResult, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, PROTOCOL_VERSION, ServerCapabilities, ToolsCallParams, ToolsCallResult,
    ToolsCapability, ToolsListResult,
};
use crate::{Error, Result};

/// Shared MCP dispatcher.
#[derive(Clone)]
pub struct McpHandler {
    app: Arc<App>,
}

impl McpHandler {
    /// Wrap an app whose tools already carry handlers.
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    /// The served app.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Handle one incoming message. Notifications produce no response.
    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification);
                None
            }
        }
    }

    /// Handle one request, mapping internal errors to JSON-RPC errors.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = %request.id, "Handling request");
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list()),
            "tools/call" => self.tools_call(request.params).await,
            // Advertised-empty surfaces so generic clients don't error
            "resources/list" => Ok(json!({"resources": []})),
            "prompts/list" => Ok(json!({"prompts": []})),
            other => Err(Error::Protocol(format!("method not found: {other}"))),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                let code = if matches!(&err, Error::Protocol(m) if m.starts_with("method not found")) {
                    rpc_codes::METHOD_NOT_FOUND
                } else {
                    err.to_rpc_code()
                };
                JsonRpcResponse::error(Some(id), code, err.to_string())
            }
        }
    }

    fn handle_notification(&self, notification: &JsonRpcNotification) {
        debug!(method = %notification.method, "Notification received");
        if notification.method == "notifications/initialized" {
            info!(app = %self.app.name, "Client initialized");
        }
    }

    fn initialize(&self) -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: Info {
                name: self.app.name.clone(),
                version: self.app.version.clone(),
            },
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    fn tools_list(&self) -> Value {
        let result = ToolsListResult {
            tools: self
                .app
                .tools
                .iter()
                .map(crate::tool::ToolDescriptor::to_protocol_tool)
                .collect(),
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    async fn tools_call(&self, params: Option<Value>) -> Result<Value> {
        let params: ToolsCallParams = serde_json::from_value(
            params.ok_or_else(|| Error::ParamsInvalid("tools/call requires params".to_string()))?,
        )
        .map_err(|err| Error::ParamsInvalid(err.to_string()))?;

        let tool = self
            .app
            .tools
            .iter()
            .find(|t| t.name == params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;
        let handler = tool
            .handler
            .as_ref()
            .ok_or_else(|| Error::Protocol(format!("tool {} has no handler", tool.name)))?;

        let arguments = match params.arguments {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::ParamsInvalid(format!(
                    "arguments must be an object, got {other}"
                )));
            }
        };

        info!(tool = %params.name, "Calling tool");
        let execution = handler(arguments).await;

        let result = ToolsCallResult {
            content: vec![Content::text(execution.content)],
            is_error: execution.error.is_some(),
            meta: if execution.metadata.is_empty() {
                None
            } else {
                Some(serde_json::to_value(&execution.metadata)?)
            },
        };
        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use crate::tool::{ExecutionResult, HandlerInput, ToolDescriptor};
    use serde_json::json;

    fn test_app() -> App {
        let mut tool = ToolDescriptor {
            name: "echo".to_string(),
            description: "Echo arguments".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
            annotations: crate::protocol::ToolAnnotations::for_http_method("echo", "GET"),
            handler_input: HandlerInput::new("get", "/echo", ""),
            source_type: "openapi".to_string(),
            handler: None,
        };
        tool.handler = Some(Arc::new(|args| {
            Box::pin(async move {
                ExecutionResult {
                    content: format!("echo {}", args.len()),
                    error: None,
                    metadata: std::collections::BTreeMap::new(),
                }
            })
        }));
        App {
            name: "Test App".to_string(),
            version: "0.1".to_string(),
            source_type: "openapi".to_string(),
            tools: vec![tool],
            config: json!({}),
        }
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_advertises_tools_capability() {
        let handler = McpHandler::new(test_app());
        let resp = handler.handle_request(request("initialize", None)).await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "Test App");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_returns_every_tool() {
        let handler = McpHandler::new(test_app());
        let resp = handler.handle_request(request("tools/list", None)).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn tools_call_runs_the_handler() {
        let handler = McpHandler::new(test_app());
        let resp = handler
            .handle_request(request(
                "tools/call",
                Some(json!({"name": "echo", "arguments": {"query__a": 1}})),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["text"], "echo 1");
        assert_eq!(result["isError"], false);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let handler = McpHandler::new(test_app());
        let resp = handler
            .handle_request(request("tools/call", Some(json!({"name": "nope"}))))
            .await;
        assert_eq!(resp.error.unwrap().code, rpc_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_maps_to_method_not_found() {
        let handler = McpHandler::new(test_app());
        let resp = handler.handle_request(request("bogus/method", None)).await;
        assert_eq!(resp.error.unwrap().code, rpc_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let handler = McpHandler::new(test_app());
        let resp = handler.handle_request(request("ping", None)).await;
        assert_eq!(resp.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let handler = McpHandler::new(test_app());
        let msg: JsonRpcMessage = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .unwrap();
        assert!(handler.handle_message(msg).await.is_none());
    }
}
