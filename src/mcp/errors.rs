use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error handling for the MCP server and its Jira collaborator.
pub type MCPResult<T> = Result<T, MCPError>;

/// Main error type for all MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum MCPError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Tool execution error: {0}")]
    ToolExecution(#[from] ToolError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Transport closed")]
    Closed,
}

/// Protocol-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout: tool execution exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Jira error: {0}")]
    Jira(#[from] JiraError),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Server operation errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Failures surfaced by the Jira REST collaborator.
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by Jira: {0}")]
    RateLimited(String),

    #[error("Jira API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// JSON-RPC error codes, as defined by JSON-RPC 2.0.
#[derive(Debug, Clone, Copy)]
pub enum JsonRpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    // -32000 to -32099 are reserved for implementation-defined server errors
    ServerError = -32000,
}

/// JSON-RPC error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<MCPError> for JsonRpcError {
    fn from(error: MCPError) -> Self {
        match error {
            MCPError::Protocol(ProtocolError::MethodNotFound(msg))
            | MCPError::Server(ServerError::MethodNotFound(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, msg)
            }
            MCPError::Protocol(ProtocolError::InvalidParams(msg))
            | MCPError::Server(ServerError::InvalidParams(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg)
            }
            MCPError::Protocol(ProtocolError::ParseError(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError, msg)
            }
            MCPError::ToolExecution(ToolError::NotFound(msg))
            | MCPError::ToolExecution(ToolError::InvalidParams(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg)
            }
            MCPError::Validation(msg) => JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg),
            _ => JsonRpcError::new(JsonRpcErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(error: ProtocolError) -> Self {
        MCPError::Protocol(error).into()
    }
}

impl From<ToolError> for JsonRpcError {
    fn from(error: ToolError) -> Self {
        MCPError::ToolExecution(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_maps_to_rpc_code() {
        let error = MCPError::Server(ServerError::MethodNotFound("bogus/method".to_string()));
        let rpc: JsonRpcError = error.into();
        assert_eq!(rpc.code, JsonRpcErrorCode::MethodNotFound as i32);
        assert!(rpc.message.contains("bogus/method"));
    }

    #[test]
    fn test_tool_param_errors_map_to_invalid_params() {
        let error = MCPError::ToolExecution(ToolError::InvalidParams("issue_key".to_string()));
        let rpc: JsonRpcError = error.into();
        assert_eq!(rpc.code, JsonRpcErrorCode::InvalidParams as i32);
    }

    #[test]
    fn test_jira_errors_fall_back_to_internal() {
        let error = MCPError::ToolExecution(ToolError::Jira(JiraError::NotFound(
            "PROJ-1".to_string(),
        )));
        let rpc: JsonRpcError = error.into();
        assert_eq!(rpc.code, JsonRpcErrorCode::InternalError as i32);
    }

    #[test]
    fn test_error_data_attachment() {
        let rpc = JsonRpcError::new(JsonRpcErrorCode::ServerError, "boom")
            .with_data(serde_json::json!({"detail": "context"}));
        assert_eq!(rpc.code, -32000);
        assert!(rpc.data.is_some());
    }
}
