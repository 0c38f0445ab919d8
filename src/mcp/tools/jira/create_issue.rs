use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::adf;
use crate::mcp::tools::{
    ExecutionContext, MCPTool, ToolError, ToolResult, optional_str, required_str,
};

/// Create a new issue. The description is authored as markdown-ish text and
/// converted to ADF before it goes over the wire.
pub struct CreateIssueTool;

#[async_trait]
impl MCPTool for CreateIssueTool {
    fn name(&self) -> &str {
        "create_issue"
    }

    fn description(&self) -> &str {
        "Create a new Jira issue in a project"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_key": {
                    "type": "string",
                    "description": "Project key, e.g. PROJ"
                },
                "summary": {
                    "type": "string",
                    "description": "Issue summary (title)"
                },
                "issue_type": {
                    "type": "string",
                    "description": "Issue type name, e.g. Task, Bug, Story",
                    "default": "Task"
                },
                "description": {
                    "type": "string",
                    "description": "Issue description; supports headings, lists, code fences and inline formatting"
                },
                "priority": {
                    "type": "string",
                    "description": "Priority name, e.g. High"
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Labels to set on the issue"
                },
                "assignee": {
                    "type": "string",
                    "description": "Account id of the assignee"
                }
            },
            "required": ["project_key", "summary"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let project_key = required_str(&params, "project_key")?;
        let summary = required_str(&params, "summary")?;
        let issue_type = optional_str(&params, "issue_type").unwrap_or("Task");

        let mut fields = json!({
            "project": { "key": project_key },
            "issuetype": { "name": issue_type },
            "summary": summary,
        });

        if let Some(description) = optional_str(&params, "description") {
            fields["description"] = adf::markdown_to_adf(description);
        }
        if let Some(priority) = optional_str(&params, "priority") {
            fields["priority"] = json!({ "name": priority });
        }
        if let Some(labels) = params["labels"].as_array() {
            fields["labels"] = json!(
                labels
                    .iter()
                    .filter_map(|label| label.as_str())
                    .collect::<Vec<_>>()
            );
        }
        if let Some(assignee) = optional_str(&params, "assignee") {
            fields["assignee"] = json!({ "accountId": assignee });
        }

        let created = context.jira.create_issue(fields).await?;
        info!("Created issue {}", created.key);

        Ok(ToolResult::text(format!(
            "Created issue {}: {}",
            created.key, created.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::test_context;

    #[test]
    fn test_tool_identity() {
        let tool = CreateIssueTool;
        assert_eq!(tool.name(), "create_issue");
        let required = tool.input_schema()["required"].clone();
        assert_eq!(required, json!(["project_key", "summary"]));
    }

    #[tokio::test]
    async fn test_missing_summary_is_invalid_params() {
        let result = CreateIssueTool
            .execute(json!({"project_key": "PROJ"}), &test_context())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_blank_project_key_is_invalid_params() {
        let result = CreateIssueTool
            .execute(
                json!({"project_key": " ", "summary": "x"}),
                &test_context(),
            )
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }
}
