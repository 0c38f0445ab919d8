use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::jira_client::JiraIssue;
use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult, required_str};

/// Search issues with a JQL query and render one summary line per hit.
pub struct SearchIssuesTool;

#[async_trait]
impl MCPTool for SearchIssuesTool {
    fn name(&self) -> &str {
        "search_issues"
    }

    fn description(&self) -> &str {
        "Search Jira issues with a JQL query"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "jql": {
                    "type": "string",
                    "description": "JQL query, e.g. \"project = PROJ AND status = 'In Progress'\""
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of issues to return",
                    "minimum": 1,
                    "maximum": 100
                }
            },
            "required": ["jql"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let jql = required_str(&params, "jql")?;
        let max_results = params["max_results"]
            .as_u64()
            .map(|limit| limit as u32)
            .unwrap_or_else(|| context.jira.default_max_results());

        debug!("Searching issues: {}", jql);
        let issues = context.jira.search_issues(jql, max_results).await?;

        if issues.is_empty() {
            return Ok(ToolResult::text("No issues matched the query"));
        }

        let mut out = format!("Found {} issue(s):\n", issues.len());
        for issue in &issues {
            out.push_str(&render_issue_line(issue));
            out.push('\n');
        }
        Ok(ToolResult::text(out))
    }
}

fn render_issue_line(issue: &JiraIssue) -> String {
    let assignee = issue.assignee.as_deref().unwrap_or("unassigned");
    format!(
        "{} [{} / {}] {} ({})",
        issue.key, issue.issue_type, issue.status, issue.summary, assignee
    )
}
