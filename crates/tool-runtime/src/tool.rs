use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use disruptor_core::DisruptorError;

/// Describes a tool's interface for remote callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "detect_container_disruption")
    pub name: String,
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Matches the caller's request id when one exists
    pub tool_call_id: String,
    /// Result content (pretty-printed JSON for every built-in tool)
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result carrying `value` as pretty JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| ToolError::ExecutionFailed(format!("JSON serialization failed: {e}")))?;
        Ok(Self {
            tool_call_id: String::new(), // Set by caller
            content,
            is_error: false,
        })
    }
}

/// Context passed to tool execution.
pub struct ToolContext {
    /// Base directory for relative paths in tool input (e.g. file loaders)
    pub working_directory: PathBuf,
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DisruptorError> for ToolError {
    fn from(e: DisruptorError) -> Self {
        match e {
            DisruptorError::Configuration(msg) => ToolError::InvalidInput(msg),
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

/// Deserialize a tool's input into its typed form.
pub fn parse_input<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}
