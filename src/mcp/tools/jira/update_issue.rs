use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::adf;
use crate::mcp::tools::{
    ExecutionContext, MCPTool, ToolError, ToolResult, optional_str, required_str,
};

/// Update fields on an existing issue. Only the fields present in the
/// argument bag are touched; a new description replaces the old one after
/// ADF conversion.
pub struct UpdateIssueTool;

#[async_trait]
impl MCPTool for UpdateIssueTool {
    fn name(&self) -> &str {
        "update_issue"
    }

    fn description(&self) -> &str {
        "Update summary, description, priority, labels or assignee of a Jira issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                },
                "summary": {
                    "type": "string",
                    "description": "New summary"
                },
                "description": {
                    "type": "string",
                    "description": "New description; supports headings, lists, code fences and inline formatting"
                },
                "priority": {
                    "type": "string",
                    "description": "New priority name"
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Replacement label set"
                },
                "assignee": {
                    "type": "string",
                    "description": "Account id of the new assignee"
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

        let mut fields = json!({});
        let mut updated: Vec<&str> = Vec::new();

        if let Some(summary) = optional_str(&params, "summary") {
            fields["summary"] = json!(summary);
            updated.push("summary");
        }
        if let Some(description) = optional_str(&params, "description") {
            fields["description"] = adf::markdown_to_adf(description);
            updated.push("description");
        }
        if let Some(priority) = optional_str(&params, "priority") {
            fields["priority"] = json!({ "name": priority });
            updated.push("priority");
        }
        if let Some(labels) = params["labels"].as_array() {
            fields["labels"] = json!(
                labels
                    .iter()
                    .filter_map(|label| label.as_str())
                    .collect::<Vec<_>>()
            );
            updated.push("labels");
        }
        if let Some(assignee) = optional_str(&params, "assignee") {
            fields["assignee"] = json!({ "accountId": assignee });
            updated.push("assignee");
        }

        if updated.is_empty() {
            return Err(ToolError::InvalidParams(
                "at least one field to update is required".to_string(),
            ));
        }

        context.jira.update_issue(issue_key, fields).await?;
        info!("Updated issue {} ({})", issue_key, updated.join(", "));

        Ok(ToolResult::text(format!(
            "Updated {} on issue {}",
            updated.join(", "),
            issue_key
        )))
    }
}
