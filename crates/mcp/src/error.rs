//! Errors raised while serving MCP requests.

use crate::types::{error_codes, JsonRpcError};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Not initialized: call initialize first")]
    NotInitialized,
}

impl McpError {
    /// JSON-RPC error object for this failure.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::JsonParse(_) => error_codes::PARSE_ERROR,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::ToolNotFound(_) => error_codes::INVALID_PARAMS,
            McpError::NotInitialized => error_codes::SERVER_NOT_INITIALIZED,
            McpError::Transport(_) => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_is_invalid_params() {
        let err = McpError::ToolNotFound("forecast".into()).to_rpc_error();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
        assert!(err.message.contains("forecast"));
    }

    #[test]
    fn not_initialized_code() {
        assert_eq!(
            McpError::NotInitialized.to_rpc_error().code,
            error_codes::SERVER_NOT_INITIALIZED
        );
    }
}
