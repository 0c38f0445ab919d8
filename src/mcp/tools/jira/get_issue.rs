use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::adf;
use crate::jira_client::JiraIssue;
use crate::mcp::tools::jira::format_timestamp;
use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult, required_str};

/// Fetch a single issue and render it as readable text.
pub struct GetIssueTool;

#[async_trait]
impl MCPTool for GetIssueTool {
    fn name(&self) -> &str {
        "get_issue"
    }

    fn description(&self) -> &str {
        "Get a Jira issue by key, including its description and metadata"
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
        debug!("Fetching issue {}", issue_key);

        let issue = context.jira.get_issue(issue_key).await?;
        Ok(ToolResult::text(render_issue(&issue)))
    }
}

/// Full text rendering of one issue.
pub(crate) fn render_issue(issue: &JiraIssue) -> String {
    let mut out = format!("{}: {}\n", issue.key, issue.summary);
    out.push_str(&format!("Type: {} | Status: {}", issue.issue_type, issue.status));
    if let Some(priority) = &issue.priority {
        out.push_str(&format!(" | Priority: {priority}"));
    }
    out.push('\n');

    if let Some(assignee) = &issue.assignee {
        out.push_str(&format!("Assignee: {assignee}\n"));
    }
    if let Some(reporter) = &issue.reporter {
        out.push_str(&format!("Reporter: {reporter}\n"));
    }
    if !issue.labels.is_empty() {
        out.push_str(&format!("Labels: {}\n", issue.labels.join(", ")));
    }
    if let Some(created) = &issue.created {
        out.push_str(&format!("Created: {}\n", format_timestamp(created)));
    }
    if let Some(updated) = &issue.updated {
        out.push_str(&format!("Updated: {}\n", format_timestamp(updated)));
    }

    match &issue.description {
        Some(description) => {
            let text = adf::adf_to_text(description);
            if text.is_empty() {
                out.push_str("\n(no description)\n");
            } else {
                out.push_str(&format!("\n{text}\n"));
            }
        }
        None => out.push_str("\n(no description)\n"),
    }

    out
}
