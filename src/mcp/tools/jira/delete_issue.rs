use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult, required_str};

/// Delete an issue permanently.
pub struct DeleteIssueTool;

#[async_trait]
impl MCPTool for DeleteIssueTool {
    fn name(&self) -> &str {
        "delete_issue"
    }

    fn description(&self) -> &str {
        "Delete a Jira issue permanently"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                }
            },
            "required": ["issue_key"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = required_str(&params, "issue_key")?;

        context.jira.delete_issue(issue_key).await?;
        info!("Deleted issue {}", issue_key);

        Ok(ToolResult::text(format!("Deleted issue {issue_key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::test_context;

    #[test]
    fn test_tool_identity() {
        let tool = DeleteIssueTool;
        assert_eq!(tool.name(), "delete_issue");
    }

    #[tokio::test]
    async fn test_missing_issue_key_is_invalid_params() {
        let result = DeleteIssueTool.execute(json!({}), &test_context()).await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }
}
