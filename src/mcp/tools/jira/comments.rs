use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::adf;
use crate::mcp::tools::jira::format_timestamp;
use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult, required_str};

/// Add a comment to an issue. The body is markdown-ish text converted to
/// ADF before submission.
pub struct AddCommentTool;

#[async_trait]
impl MCPTool for AddCommentTool {
    fn name(&self) -> &str {
        "add_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to a Jira issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                },
                "body": {
                    "type": "string",
                    "description": "Comment text; supports headings, lists, code fences and inline formatting"
                }
            },
            "required": ["issue_key", "body"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = required_str(&params, "issue_key")?;
        let body = required_str(&params, "body")?;

        let comment_id = context
            .jira
            .add_comment(issue_key, adf::markdown_to_adf(body))
            .await?;
        info!("Added comment {} to issue {}", comment_id, issue_key);

        Ok(ToolResult::text(format!(
            "Added comment {comment_id} to issue {issue_key}"
        )))
    }
}

/// Fetch the comments on an issue and render them oldest first.
pub struct GetCommentsTool;

#[async_trait]
impl MCPTool for GetCommentsTool {
    fn name(&self) -> &str {
        "get_comments"
    }

    fn description(&self) -> &str {
        "Get the comments on a Jira issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of comments to return",
                    "minimum": 1,
                    "maximum": 100
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
        let max_results = params["max_results"]
            .as_u64()
            .map(|limit| limit as u32)
            .unwrap_or_else(|| context.jira.default_max_results());

        debug!("Fetching comments for {}", issue_key);
        let comments = context.jira.get_comments(issue_key, max_results).await?;

        if comments.is_empty() {
            return Ok(ToolResult::text(format!("No comments on {issue_key}")));
        }

        let mut out = format!("{} comment(s) on {}:\n", comments.len(), issue_key);
        for comment in &comments {
            let when = comment
                .created
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default();
            out.push_str(&format!("\n[{}] {} {}\n", comment.id, comment.author, when));
            out.push_str(&adf::adf_to_text(&comment.body));
            out.push('\n');
        }
        Ok(ToolResult::text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::test_context;

    #[test]
    fn test_tool_identities() {
        assert_eq!(AddCommentTool.name(), "add_comment");
        assert_eq!(GetCommentsTool.name(), "get_comments");
        assert_eq!(
            AddCommentTool.input_schema()["required"],
            json!(["issue_key", "body"])
        );
    }

    #[tokio::test]
    async fn test_add_comment_requires_body() {
        let result = AddCommentTool
            .execute(json!({"issue_key": "PROJ-1"}), &test_context())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_get_comments_requires_issue_key() {
        let result = GetCommentsTool.execute(json!({}), &test_context()).await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }
}
