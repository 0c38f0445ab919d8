use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::mcp::errors::{JsonRpcError, MCPError, MCPResult, ProtocolError};

/// JSON-RPC 2.0 message structure for MCP. A single struct covers requests,
/// responses and notifications; `validate` enforces the field-consistency
/// rules between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Typed request view of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Typed notification view of a message (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl MCPMessage {
    const JSONRPC_VERSION: &'static str = "2.0";

    /// Create a new request message with a generated id.
    pub fn request(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(Value::String(Uuid::new_v4().to_string())),
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a successful response to the request with the given id.
    pub fn response(id: Value, result: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result,
            error: None,
        }
    }

    /// Create an error response to the request with the given id.
    pub fn error_response(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Create a notification message.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: None,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    pub fn is_response(&self) -> bool {
        self.id.is_some()
            && self.method.is_none()
            && (self.result.is_some() || self.error.is_some())
    }

    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Validate the message structure.
    pub fn validate(&self) -> MCPResult<()> {
        if self.jsonrpc != Self::JSONRPC_VERSION {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(format!(
                "Invalid JSON-RPC version: {}",
                self.jsonrpc
            ))));
        }

        if self.is_request() || self.is_notification() {
            if self.result.is_some() || self.error.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Request and notification messages cannot carry result or error".to_string(),
                )));
            }
        } else if self.is_response() {
            // A response carries exactly one of result / error.
            if self.result.is_some() && self.error.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Response cannot have both result and error".to_string(),
                )));
            }
        } else {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message does not match any valid type (request, response, notification)"
                    .to_string(),
            )));
        }

        Ok(())
    }

    /// Convert to a typed request.
    pub fn as_request(&self) -> MCPResult<MCPRequest> {
        match (&self.id, &self.method) {
            (Some(id), Some(method)) => Ok(MCPRequest {
                jsonrpc: self.jsonrpc.clone(),
                id: id.clone(),
                method: method.clone(),
                params: self.params.clone(),
            }),
            _ => Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message is not a request".to_string(),
            ))),
        }
    }

    /// Convert to a typed notification.
    pub fn as_notification(&self) -> MCPResult<MCPNotification> {
        match (&self.id, &self.method) {
            (None, Some(method)) => Ok(MCPNotification {
                jsonrpc: self.jsonrpc.clone(),
                method: method.clone(),
                params: self.params.clone(),
            }),
            _ => Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message is not a notification".to_string(),
            ))),
        }
    }
}

/// MCP protocol initialization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

/// Capabilities advertised by the connecting client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default)]
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Client information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Capabilities advertised by this server. Only tools are offered; there are
/// no prompts or resources to expose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: ToolsCapability,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Protocol message parser for newline-delimited JSON frames.
pub struct MessageParser;

impl MessageParser {
    /// Parse a message from JSON bytes.
    pub fn parse_message(data: &[u8]) -> MCPResult<MCPMessage> {
        let message: MCPMessage = serde_json::from_slice(data)
            .map_err(|e| MCPError::Protocol(ProtocolError::ParseError(e.to_string())))?;

        message.validate()?;
        Ok(message)
    }

    /// Serialize a message to JSON bytes.
    pub fn serialize_message(message: &MCPMessage) -> MCPResult<Vec<u8>> {
        message.validate()?;
        serde_json::to_vec(message)
            .map_err(|e| MCPError::Protocol(ProtocolError::InternalError(e.to_string())))
    }

    /// Parse every non-blank line of a buffer as its own message.
    pub fn parse_messages(buffer: &str) -> Vec<MCPResult<MCPMessage>> {
        buffer
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Self::parse_message(line.as_bytes()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_message() {
        let msg = MCPMessage::request("tools/call", Some(json!({"name": "get_issue"})));
        assert!(msg.is_request());
        assert!(!msg.is_response());
        assert!(!msg.is_notification());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_response_message() {
        let msg = MCPMessage::response(json!("req-1"), Some(json!({"tools": []})));
        assert!(msg.is_response());
        assert!(!msg.is_request());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_notification_message() {
        let msg = MCPMessage::notification("notifications/initialized", None);
        assert!(msg.is_notification());
        assert!(!msg.is_request());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_request_with_result_is_invalid() {
        let mut msg = MCPMessage::request("tools/list", None);
        msg.result = Some(json!("unexpected"));
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_wrong_version_is_invalid() {
        let mut msg = MCPMessage::request("tools/list", None);
        msg.jsonrpc = "1.0".to_string();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_message_parsing() {
        let data = r#"{"jsonrpc":"2.0","id":"1","method":"initialize","params":{}}"#;
        let message = MessageParser::parse_message(data.as_bytes()).unwrap();
        assert!(message.is_request());
        assert_eq!(message.method.as_deref(), Some("initialize"));
    }

    #[test]
    fn test_buffer_parsing_skips_blank_lines() {
        let buffer = "\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n";
        let results = MessageParser::parse_messages(buffer);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_as_request_round_trip() {
        let msg = MCPMessage::request("tools/list", None);
        let request = msg.as_request().unwrap();
        assert_eq!(request.method, "tools/list");
        assert!(MCPMessage::notification("x", None).as_request().is_err());
    }
}
