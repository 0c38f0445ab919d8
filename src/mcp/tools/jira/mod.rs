pub mod attachments;
pub mod comments;
pub mod create_issue;
pub mod delete_issue;
pub mod get_issue;
pub mod projects;
pub mod search_issues;
pub mod transitions;
pub mod update_issue;
/// Jira tools: the fixed set of operations exposed over `tools/call`.
///
/// Each tool is a thin mapping from its argument bag to one or two REST
/// calls; markdown-ish text arguments (descriptions, comment bodies) pass
/// through the ADF converter on the way out.
pub use self::attachments::{DownloadAttachmentTool, ListAttachmentsTool, UploadAttachmentTool};
pub use self::comments::{AddCommentTool, GetCommentsTool};
pub use self::create_issue::CreateIssueTool;
pub use self::delete_issue::DeleteIssueTool;
pub use self::get_issue::GetIssueTool;
pub use self::projects::ListProjectsTool;
pub use self::search_issues::SearchIssuesTool;
pub use self::transitions::TransitionIssueTool;
pub use self::update_issue::UpdateIssueTool;

use chrono::DateTime;

/// Render a Jira timestamp ("2024-01-15T10:30:00.000+0000") for humans.
/// Anything unparseable is shown as-is.
pub(crate) fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|parsed| parsed.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_jira_style() {
        assert_eq!(
            format_timestamp("2024-01-15T10:30:00.000+0000"),
            "2024-01-15 10:30"
        );
    }

    #[test]
    fn test_format_timestamp_rfc3339() {
        assert_eq!(
            format_timestamp("2024-01-15T10:30:00+00:00"),
            "2024-01-15 10:30"
        );
    }

    #[test]
    fn test_format_timestamp_passthrough_on_garbage() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
