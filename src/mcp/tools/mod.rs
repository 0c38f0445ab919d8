pub mod jira;
pub mod registry;
/// MCP tools module: the tool trait, execution context and result types
/// shared by every tool, plus the registry that dispatches `tools/call`.
pub use self::registry::ToolRegistry;

pub use crate::mcp::errors::ToolError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::jira_client::JiraClient;

/// Core trait implemented by every tool exposed over `tools/list`.
#[async_trait]
pub trait MCPTool: Send + Sync {
    /// Unique tool identifier, as advertised to the client.
    fn name(&self) -> &str;

    /// Human-readable description for tool discovery.
    fn description(&self) -> &str;

    /// JSON schema for the tool's input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError>;
}

/// Everything a tool needs at execution time. Tools are stateless; the
/// context carries the shared collaborators.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Shared Jira REST client.
    pub jira: Arc<JiraClient>,
}

impl ExecutionContext {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

/// Result of a tool execution, serialized into the MCP `tools/call`
/// response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Content items a tool can return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text content.
    #[serde(rename = "text")]
    Text { text: String },

    /// Structured data content.
    #[serde(rename = "data")]
    Data { data: Value },
}

impl ToolResult {
    /// Successful result with a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Failed result carrying the error description as text.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Append a structured data item.
    pub fn with_data(mut self, data: Value) -> Self {
        self.content.push(Content::Data { data });
        self
    }
}

/// Extract a required string parameter from a tool argument bag.
pub fn required_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    params[field]
        .as_str()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidParams(format!("'{field}' is required")))
}

/// Extract an optional string parameter, treating empty strings as absent.
pub fn optional_str<'a>(params: &'a Value, field: &str) -> Option<&'a str> {
    params[field].as_str().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
pub(crate) fn test_context() -> ExecutionContext {
    use crate::config::JiraConfig;

    let config = JiraConfig {
        base_url: "https://example.atlassian.net".to_string(),
        email: "dev@example.com".to_string(),
        api_token: "token".to_string(),
        request_timeout_secs: 5,
        default_max_results: 25,
    };
    ExecutionContext::new(Arc::new(
        JiraClient::new(config).expect("test client should build"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_result_serializes_without_error_flag() {
        let result = ToolResult::text("done");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "done");
        assert!(value.get("isError").is_none());
    }

    #[test]
    fn test_error_result_sets_flag() {
        let result = ToolResult::error("boom");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], true);
    }

    #[test]
    fn test_required_str_rejects_missing_and_blank() {
        let params = json!({"present": "x", "blank": "  "});
        assert_eq!(required_str(&params, "present").unwrap(), "x");
        assert!(required_str(&params, "blank").is_err());
        assert!(required_str(&params, "absent").is_err());
    }

    #[test]
    fn test_optional_str_treats_blank_as_absent() {
        let params = json!({"a": "x", "b": ""});
        assert_eq!(optional_str(&params, "a"), Some("x"));
        assert_eq!(optional_str(&params, "b"), None);
        assert_eq!(optional_str(&params, "c"), None);
    }
}
