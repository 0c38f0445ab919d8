use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::mcp::tools::{
    ExecutionContext, MCPTool, ToolError, ToolResult, optional_str, required_str,
};

/// Move an issue through its workflow. Without a `transition` argument the
/// tool lists the transitions currently available; with one it resolves the
/// transition by id or name and executes it.
pub struct TransitionIssueTool;

#[async_trait]
impl MCPTool for TransitionIssueTool {
    fn name(&self) -> &str {
        "transition_issue"
    }

    fn description(&self) -> &str {
        "List available workflow transitions for a Jira issue, or execute one by id or name"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                },
                "transition": {
                    "type": "string",
                    "description": "Transition id or name to execute; omit to list the available transitions"
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
        let transitions = context.jira.get_transitions(issue_key).await?;

        let Some(wanted) = optional_str(&params, "transition") else {
            if transitions.is_empty() {
                return Ok(ToolResult::text(format!(
                    "No transitions available on {issue_key}"
                )));
            }
            let mut out = format!("Available transitions for {issue_key}:\n");
            for transition in &transitions {
                out.push_str(&format!(
                    "[{}] {} -> {}\n",
                    transition.id, transition.name, transition.to_status
                ));
            }
            return Ok(ToolResult::text(out));
        };

        let matched = transitions
            .iter()
            .find(|transition| {
                transition.id == wanted || transition.name.eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                ToolError::InvalidParams(format!(
                    "No transition '{wanted}' on {issue_key}; available: {}",
                    transitions
                        .iter()
                        .map(|t| t.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

        context.jira.transition_issue(issue_key, &matched.id).await?;
        info!("Transitioned {} via '{}'", issue_key, matched.name);

        Ok(ToolResult::text(format!(
            "Issue {} transitioned to {}",
            issue_key, matched.to_status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::test_context;

    #[test]
    fn test_tool_identity() {
        let tool = TransitionIssueTool;
        assert_eq!(tool.name(), "transition_issue");
        assert_eq!(tool.input_schema()["required"][0], "issue_key");
    }

    #[tokio::test]
    async fn test_missing_issue_key_is_invalid_params() {
        let result = TransitionIssueTool
            .execute(json!({}), &test_context())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }
}
