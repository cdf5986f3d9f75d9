//! MCP server over a [`ToolRegistry`].
//!
//! One request per line in, one response per line out. Notifications are
//! consumed silently. `tools/list` and `tools/call` are refused until the
//! client has sent `initialize`.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use disruptor_tool_runtime::{ToolContext, ToolRegistry};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

pub struct McpServer {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
    initialized: bool,
    working_directory: PathBuf,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_name: "disruptor".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Base directory for relative paths in tool input.
    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.working_directory = dir;
        self
    }

    /// Serve until the transport closes.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        info!(server = %self.server_name, tools = self.registry.len(), "MCP server starting");

        while let Some(line) = transport.receive().await? {
            debug!(message = %line, "Received message");
            if let Some(response) = self.handle_line(&line).await {
                let json = serde_json::to_string(&response)?;
                debug!(response = %json, "Sending response");
                transport.send(&json).await?;
            }
        }

        info!("Transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw message. `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON");
                return Some(JsonRpcResponse::failure(
                    RpcId::Number(0),
                    McpError::JsonParse(e).to_rpc_error(),
                ));
            }
        };

        if raw.get("id").is_none() {
            match raw.get("method").and_then(Value::as_str) {
                Some(method) => self.handle_notification(method),
                None => warn!("Message without id or method, ignoring"),
            }
            return None;
        }

        match serde_json::from_value::<JsonRpcRequest>(raw) {
            Ok(request) => Some(self.handle_request(&request).await),
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON-RPC request");
                Some(JsonRpcResponse::failure(
                    RpcId::Number(0),
                    McpError::JsonParse(e).to_rpc_error(),
                ))
            }
        }
    }

    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(&request.params),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(&request.params).await,
            method => Err(McpError::MethodNotFound(method.to_string())),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                warn!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::failure(id, e.to_rpc_error())
            }
        }
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" => info!("Client confirmed initialization"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            method => debug!(method = %method, "Unknown notification, ignoring"),
        }
    }

    fn ensure_initialized(&self) -> Result<(), McpError> {
        if self.initialized {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    fn initialize(&mut self, params: &Option<Value>) -> Result<Value, McpError> {
        let params: Option<InitializeParams> = params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;
        let client = params
            .as_ref()
            .and_then(|p| p.client_info.as_ref())
            .map(|c| c.name.as_str())
            .unwrap_or("unknown");
        let requested = params
            .as_ref()
            .and_then(|p| p.protocol_version.as_deref())
            .unwrap_or(PROTOCOL_VERSION);
        info!(client, requested, "Handling initialize");
        self.initialized = true;

        to_value(InitializeResult::tools_only(&self.server_name, &self.server_version))
    }

    fn list_tools(&self) -> Result<Value, McpError> {
        self.ensure_initialized()?;
        let tools = self.registry.list().into_iter().map(ToolInfo::from).collect();
        to_value(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: &Option<Value>) -> Result<Value, McpError> {
        self.ensure_initialized()?;
        let params = params
            .clone()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| McpError::ToolNotFound(call.name.clone()))?;
        debug!(tool = %call.name, "Handling tools/call");

        let ctx = ToolContext {
            working_directory: self.working_directory.clone(),
        };
        // Tool failures are results, not protocol errors.
        let result = match tool.execute(call.arguments, &ctx).await {
            Ok(out) => CallToolResult::text(out.content, out.is_error),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                CallToolResult::text(e.to_string(), true)
            }
        };
        to_value(result)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}
