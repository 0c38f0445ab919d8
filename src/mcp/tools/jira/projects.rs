use async_trait::async_trait;
use serde_json::{Value, json};

use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult};

/// List the projects visible to the configured account.
pub struct ListProjectsTool;

#[async_trait]
impl MCPTool for ListProjectsTool {
    fn name(&self) -> &str {
        "list_projects"
    }

    fn description(&self) -> &str {
        "List the Jira projects visible to the configured account"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let projects = context.jira.get_visible_projects().await?;

        if projects.is_empty() {
            return Ok(ToolResult::text("No visible projects"));
        }

        let mut out = format!("{} project(s):\n", projects.len());
        for project in &projects {
            out.push_str(&format!("{} - {}", project.key, project.name));
            if let Some(project_type) = &project.project_type {
                out.push_str(&format!(" ({project_type})"));
            }
            out.push('\n');
        }
        Ok(ToolResult::text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_identity() {
        let tool = ListProjectsTool;
        assert_eq!(tool.name(), "list_projects");
        assert!(tool.input_schema()["properties"].is_object());
    }
}
