use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::mcp::tools::jira::format_timestamp;
use crate::mcp::tools::{
    ExecutionContext, MCPTool, ToolError, ToolResult, optional_str, required_str,
};

/// List the attachments on an issue.
pub struct ListAttachmentsTool;

#[async_trait]
impl MCPTool for ListAttachmentsTool {
    fn name(&self) -> &str {
        "list_attachments"
    }

    fn description(&self) -> &str {
        "List the attachments on a Jira issue"
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

        let attachments = context.jira.list_attachments(issue_key).await?;
        if attachments.is_empty() {
            return Ok(ToolResult::text(format!("No attachments on {issue_key}")));
        }

        let mut out = format!("{} attachment(s) on {}:\n", attachments.len(), issue_key);
        for attachment in &attachments {
            let when = attachment
                .created
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default();
            out.push_str(&format!(
                "[{}] {} ({}, {} bytes) {}\n",
                attachment.id, attachment.filename, attachment.mime_type, attachment.size, when
            ));
        }
        Ok(ToolResult::text(out))
    }
}

/// Download one attachment, either to a file on disk or inline as base64.
pub struct DownloadAttachmentTool;

#[async_trait]
impl MCPTool for DownloadAttachmentTool {
    fn name(&self) -> &str {
        "download_attachment"
    }

    fn description(&self) -> &str {
        "Download a Jira attachment by id, to a file or inline as base64"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "attachment_id": {
                    "type": "string",
                    "description": "Attachment id, as shown by list_attachments"
                },
                "output_path": {
                    "type": "string",
                    "description": "File path to write to; when omitted the content is returned base64-encoded"
                }
            },
            "required": ["attachment_id"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let attachment_id = required_str(&params, "attachment_id")?;

        debug!("Downloading attachment {}", attachment_id);
        let bytes = context.jira.download_attachment(attachment_id).await?;

        match optional_str(&params, "output_path") {
            Some(output_path) => {
                fs::write(output_path, &bytes).await.map_err(|e| {
                    ToolError::FileSystem(format!("Failed to write {output_path}: {e}"))
                })?;
                info!("Wrote attachment {} to {}", attachment_id, output_path);
                Ok(ToolResult::text(format!(
                    "Saved attachment {} ({} bytes) to {}",
                    attachment_id,
                    bytes.len(),
                    output_path
                )))
            }
            None => {
                let encoded = base64::encode(&bytes);
                Ok(ToolResult::text(format!(
                    "Attachment {} ({} bytes), base64:\n{}",
                    attachment_id,
                    bytes.len(),
                    encoded
                )))
            }
        }
    }
}

/// Attach a local file to an issue.
pub struct UploadAttachmentTool;

#[async_trait]
impl MCPTool for UploadAttachmentTool {
    fn name(&self) -> &str {
        "upload_attachment"
    }

    fn description(&self) -> &str {
        "Upload a local file as an attachment on a Jira issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "Issue key, e.g. PROJ-123"
                },
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to upload"
                }
            },
            "required": ["issue_key", "file_path"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = required_str(&params, "issue_key")?;
        let file_path = required_str(&params, "file_path")?;

        let filename = Path::new(file_path)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ToolError::InvalidParams(format!("'{file_path}' has no usable file name"))
            })?;

        let bytes = fs::read(file_path)
            .await
            .map_err(|e| ToolError::FileSystem(format!("Failed to read {file_path}: {e}")))?;

        let attachment = context
            .jira
            .upload_attachment(issue_key, filename, bytes)
            .await?;
        info!("Uploaded {} to issue {}", attachment.filename, issue_key);

        Ok(ToolResult::text(format!(
            "Uploaded {} ({} bytes) to {} as attachment {}",
            attachment.filename, attachment.size, issue_key, attachment.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::test_context;

    #[test]
    fn test_tool_identities() {
        assert_eq!(ListAttachmentsTool.name(), "list_attachments");
        assert_eq!(DownloadAttachmentTool.name(), "download_attachment");
        assert_eq!(UploadAttachmentTool.name(), "upload_attachment");
    }

    #[tokio::test]
    async fn test_download_requires_attachment_id() {
        let result = DownloadAttachmentTool
            .execute(json!({}), &test_context())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_directory_like_path() {
        let result = UploadAttachmentTool
            .execute(
                json!({"issue_key": "PROJ-1", "file_path": "/tmp/.."}),
                &test_context(),
            )
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_filesystem_error() {
        let result = UploadAttachmentTool
            .execute(
                json!({"issue_key": "PROJ-1", "file_path": "/nonexistent/report.txt"}),
                &test_context(),
            )
            .await;
        assert!(matches!(result, Err(ToolError::FileSystem(_))));
    }
}
