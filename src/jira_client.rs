use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::JiraConfig;
use crate::mcp::errors::JiraError;

/// Client for the Jira Cloud REST API (v3).
///
/// Handles authentication, rate limiting and response decoding; every tool
/// goes through this client for its network work. Descriptions and comment
/// bodies are ADF values produced by [`crate::adf`].
pub struct JiraClient {
    http: Client,
    config: JiraConfig,
    client_config: JiraClientConfig,

    /// Cache for slow-changing metadata such as the visible project list.
    metadata_cache: RwLock<HashMap<String, CachedMetadata>>,

    /// Rate limiter to respect Jira API limits.
    rate_limiter: Mutex<RateLimiter>,
}

/// Tuning knobs for the client, independent of credentials.
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    /// Maximum requests per second against the REST API.
    pub rate_limit: f64,

    /// Cache TTL for metadata lookups.
    pub metadata_cache_ttl: Duration,
}

impl Default for JiraClientConfig {
    fn default() -> Self {
        Self {
            rate_limit: 10.0,
            metadata_cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedMetadata {
    data: Value,
    expires_at: SystemTime,
}

/// Windowed rate limiter for API calls.
#[derive(Debug)]
struct RateLimiter {
    requests_in_window: u32,
    window_start: SystemTime,
    window_duration: Duration,
    max_requests_per_window: u32,
}

impl RateLimiter {
    fn new(requests_per_second: f64) -> Self {
        Self {
            requests_in_window: 0,
            window_start: SystemTime::now(),
            window_duration: Duration::from_secs(1),
            max_requests_per_window: (requests_per_second as u32).max(1),
        }
    }

    async fn acquire_permit(&mut self) {
        let now = SystemTime::now();
        let elapsed = now
            .duration_since(self.window_start)
            .unwrap_or(Duration::ZERO);

        if elapsed >= self.window_duration {
            self.window_start = now;
            self.requests_in_window = 0;
        } else if self.requests_in_window >= self.max_requests_per_window {
            tokio::time::sleep(self.window_duration - elapsed).await;
            self.window_start = SystemTime::now();
            self.requests_in_window = 0;
        }

        self.requests_in_window += 1;
    }
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self, JiraError> {
        Self::with_client_config(config, JiraClientConfig::default())
    }

    pub fn with_client_config(
        config: JiraConfig,
        client_config: JiraClientConfig,
    ) -> Result<Self, JiraError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            rate_limiter: Mutex::new(RateLimiter::new(client_config.rate_limit)),
            metadata_cache: RwLock::new(HashMap::new()),
            client_config,
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Listing cap applied when the caller does not pass `max_results`.
    pub fn default_max_results(&self) -> u32 {
        self.config.default_max_results
    }

    /// Issue one authenticated request and decode the JSON response body.
    /// `204 No Content` decodes to `Value::Null`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, JiraError> {
        self.rate_limiter.lock().await.acquire_permit().await;

        let url = format!("{}{}", self.config.base_url, path);
        debug!("Jira request: {} {}", method, path);

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("Accept", "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            let text = response.text().await?;
            if text.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| JiraError::MalformedResponse(e.to_string()));
        }

        let message = error_message(response.text().await.unwrap_or_default(), status);
        Err(match status {
            StatusCode::UNAUTHORIZED => JiraError::Authentication(message),
            StatusCode::FORBIDDEN => JiraError::Forbidden(message),
            StatusCode::NOT_FOUND => JiraError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => JiraError::RateLimited(message),
            _ => JiraError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Fetch a single issue by key.
    pub async fn get_issue(&self, issue_key: &str) -> Result<JiraIssue, JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}?fields={ISSUE_FIELDS}");
        let response = self.request(Method::GET, &path, None).await?;
        JiraIssue::from_response(&response)
    }

    /// Create an issue; `fields` is the full Jira `fields` object.
    pub async fn create_issue(&self, fields: Value) -> Result<CreatedIssue, JiraError> {
        let response = self
            .request(Method::POST, "/rest/api/3/issue", Some(json!({ "fields": fields })))
            .await?;

        let key = response["key"]
            .as_str()
            .ok_or_else(|| JiraError::MalformedResponse("create response missing key".to_string()))?;

        Ok(CreatedIssue {
            key: key.to_string(),
            id: response["id"].as_str().unwrap_or_default().to_string(),
            url: format!("{}/browse/{}", self.config.base_url, key),
        })
    }

    /// Update fields on an existing issue.
    pub async fn update_issue(&self, issue_key: &str, fields: Value) -> Result<(), JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}");
        self.request(Method::PUT, &path, Some(json!({ "fields": fields })))
            .await?;
        Ok(())
    }

    /// Delete an issue.
    pub async fn delete_issue(&self, issue_key: &str) -> Result<(), JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}");
        self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Search issues with JQL.
    pub async fn search_issues(
        &self,
        jql: &str,
        max_results: u32,
    ) -> Result<Vec<JiraIssue>, JiraError> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": ISSUE_FIELDS.split(',').collect::<Vec<_>>(),
        });
        let response = self
            .request(Method::POST, "/rest/api/3/search", Some(body))
            .await?;

        response["issues"]
            .as_array()
            .ok_or_else(|| JiraError::MalformedResponse("search response missing issues".to_string()))?
            .iter()
            .map(JiraIssue::from_response)
            .collect()
    }

    /// Add a comment with an ADF body. Returns the new comment id.
    pub async fn add_comment(&self, issue_key: &str, body_adf: Value) -> Result<String, JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}/comment");
        let response = self
            .request(Method::POST, &path, Some(json!({ "body": body_adf })))
            .await?;

        response["id"]
            .as_str()
            .map(|id| id.to_string())
            .ok_or_else(|| JiraError::MalformedResponse("comment response missing id".to_string()))
    }

    /// Fetch comments for an issue, oldest first.
    pub async fn get_comments(
        &self,
        issue_key: &str,
        max_results: u32,
    ) -> Result<Vec<JiraComment>, JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}/comment?maxResults={max_results}");
        let response = self.request(Method::GET, &path, None).await?;

        Ok(response["comments"]
            .as_array()
            .map(|comments| comments.iter().map(JiraComment::from_response).collect())
            .unwrap_or_default())
    }

    /// List the attachments on an issue.
    pub async fn list_attachments(
        &self,
        issue_key: &str,
    ) -> Result<Vec<JiraAttachment>, JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}?fields=attachment");
        let response = self.request(Method::GET, &path, None).await?;

        Ok(response["fields"]["attachment"]
            .as_array()
            .map(|attachments| {
                attachments
                    .iter()
                    .map(JiraAttachment::from_response)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Download the binary content of an attachment. Jira answers with a
    /// redirect to the media store, which reqwest follows.
    pub async fn download_attachment(&self, attachment_id: &str) -> Result<Vec<u8>, JiraError> {
        self.rate_limiter.lock().await.acquire_permit().await;

        let url = format!(
            "{}/rest/api/3/attachment/content/{}",
            self.config.base_url, attachment_id
        );
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default(), status);
            return Err(match status {
                StatusCode::NOT_FOUND => JiraError::NotFound(message),
                StatusCode::UNAUTHORIZED => JiraError::Authentication(message),
                _ => JiraError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Attach a file to an issue via multipart upload.
    pub async fn upload_attachment(
        &self,
        issue_key: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<JiraAttachment, JiraError> {
        self.rate_limiter.lock().await.acquire_permit().await;

        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!(
            "{}/rest/api/3/issue/{}/attachments",
            self.config.base_url, issue_key
        );
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            // Required by Jira to bypass XSRF protection on uploads.
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default(), status);
            return Err(JiraError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        body.as_array()
            .and_then(|uploaded| uploaded.first())
            .map(JiraAttachment::from_response)
            .ok_or_else(|| JiraError::MalformedResponse("upload response missing attachment".to_string()))
    }

    /// Get the projects visible to the configured account. Results are
    /// cached because project lists change rarely and tools hit this often.
    pub async fn get_visible_projects(&self) -> Result<Vec<JiraProject>, JiraError> {
        const CACHE_KEY: &str = "projects";

        if let Some(cached) = self.cached_metadata(CACHE_KEY).await {
            debug!("Using cached project list");
            return parse_projects(&cached);
        }

        let response = self
            .request(Method::GET, "/rest/api/3/project/search?maxResults=100", None)
            .await?;
        let values = response["values"].clone();

        self.store_metadata(CACHE_KEY, values.clone()).await;
        parse_projects(&values)
    }

    /// List the transitions currently available on an issue.
    pub async fn get_transitions(&self, issue_key: &str) -> Result<Vec<JiraTransition>, JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}/transitions");
        let response = self.request(Method::GET, &path, None).await?;

        Ok(response["transitions"]
            .as_array()
            .map(|transitions| {
                transitions
                    .iter()
                    .map(|transition| JiraTransition {
                        id: transition["id"].as_str().unwrap_or_default().to_string(),
                        name: transition["name"].as_str().unwrap_or_default().to_string(),
                        to_status: transition["to"]["name"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Execute a transition by id.
    pub async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), JiraError> {
        let path = format!("/rest/api/3/issue/{issue_key}/transitions");
        let body = json!({ "transition": { "id": transition_id } });
        self.request(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    async fn cached_metadata(&self, key: &str) -> Option<Value> {
        let cache = self.metadata_cache.read().await;
        cache
            .get(key)
            .filter(|cached| cached.expires_at > SystemTime::now())
            .map(|cached| cached.data.clone())
    }

    async fn store_metadata(&self, key: &str, data: Value) {
        let mut cache = self.metadata_cache.write().await;
        cache.insert(key.to_string(), CachedMetadata {
            data,
            expires_at: SystemTime::now() + self.client_config.metadata_cache_ttl,
        });
    }
}

/// Fields requested when fetching or searching issues.
const ISSUE_FIELDS: &str =
    "summary,description,status,issuetype,priority,assignee,reporter,labels,created,updated";

/// Pull a readable message out of a Jira error body, which usually looks
/// like `{"errorMessages": [...], "errors": {...}}`.
fn error_message(body: String, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
        let mut messages: Vec<String> = Vec::new();

        if let Some(error_messages) = parsed["errorMessages"].as_array() {
            messages.extend(
                error_messages
                    .iter()
                    .filter_map(|m| m.as_str())
                    .map(|m| m.to_string()),
            );
        }
        if let Some(errors) = parsed["errors"].as_object() {
            messages.extend(
                errors
                    .iter()
                    .filter_map(|(field, m)| m.as_str().map(|m| format!("{field}: {m}"))),
            );
        }

        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body
    }
}

fn parse_projects(values: &Value) -> Result<Vec<JiraProject>, JiraError> {
    values
        .as_array()
        .ok_or_else(|| JiraError::MalformedResponse("project response missing values".to_string()))
        .map(|projects| {
            projects
                .iter()
                .map(|project| JiraProject {
                    key: project["key"].as_str().unwrap_or_default().to_string(),
                    name: project["name"].as_str().unwrap_or_default().to_string(),
                    id: project["id"].as_str().unwrap_or_default().to_string(),
                    project_type: project["projectTypeKey"].as_str().map(|s| s.to_string()),
                })
                .collect()
        })
}

// Data structures

/// One issue, with the fields this server requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub labels: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    /// Raw ADF description, rendered to text at display time.
    pub description: Option<Value>,
}

impl JiraIssue {
    fn from_response(issue: &Value) -> Result<Self, JiraError> {
        let key = issue["key"]
            .as_str()
            .ok_or_else(|| JiraError::MalformedResponse("issue missing key".to_string()))?;
        let fields = &issue["fields"];

        Ok(Self {
            key: key.to_string(),
            summary: fields["summary"].as_str().unwrap_or_default().to_string(),
            status: fields["status"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            issue_type: fields["issuetype"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            priority: fields["priority"]["name"].as_str().map(|s| s.to_string()),
            assignee: fields["assignee"]["displayName"]
                .as_str()
                .map(|s| s.to_string()),
            reporter: fields["reporter"]["displayName"]
                .as_str()
                .map(|s| s.to_string()),
            labels: fields["labels"]
                .as_array()
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|l| l.as_str())
                        .map(|l| l.to_string())
                        .collect()
                })
                .unwrap_or_default(),
            created: fields["created"].as_str().map(|s| s.to_string()),
            updated: fields["updated"].as_str().map(|s| s.to_string()),
            description: match &fields["description"] {
                Value::Null => None,
                description => Some(description.clone()),
            },
        })
    }
}

/// Key and browse URL of a freshly created issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
    pub id: String,
    pub url: String,
}

/// One comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraComment {
    pub id: String,
    pub author: String,
    pub created: Option<String>,
    /// Raw ADF body, rendered to text at display time.
    pub body: Value,
}

impl JiraComment {
    fn from_response(comment: &Value) -> Self {
        Self {
            id: comment["id"].as_str().unwrap_or_default().to_string(),
            author: comment["author"]["displayName"]
                .as_str()
                .unwrap_or("Unknown")
                .to_string(),
            created: comment["created"].as_str().map(|s| s.to_string()),
            body: comment["body"].clone(),
        }
    }
}

/// Attachment metadata on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraAttachment {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub author: Option<String>,
    pub created: Option<String>,
}

impl JiraAttachment {
    fn from_response(attachment: &Value) -> Self {
        Self {
            id: attachment["id"].as_str().unwrap_or_default().to_string(),
            filename: attachment["filename"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            size: attachment["size"].as_u64().unwrap_or_default(),
            mime_type: attachment["mimeType"]
                .as_str()
                .unwrap_or("application/octet-stream")
                .to_string(),
            author: attachment["author"]["displayName"]
                .as_str()
                .map(|s| s.to_string()),
            created: attachment["created"].as_str().map(|s| s.to_string()),
        }
    }
}

/// A visible project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraProject {
    pub key: String,
    pub name: String,
    pub id: String,
    pub project_type: Option<String>,
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraTransition {
    pub id: String,
    pub name: String,
    pub to_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JiraConfig {
        JiraConfig {
            base_url: "https://example.atlassian.net".to_string(),
            email: "dev@example.com".to_string(),
            api_token: "token".to_string(),
            request_timeout_secs: 5,
            default_max_results: 25,
        }
    }

    #[test]
    fn test_client_builds_from_config() {
        let client = JiraClient::new(test_config()).unwrap();
        assert_eq!(client.base_url(), "https://example.atlassian.net");
    }

    #[test]
    fn test_issue_parsing() {
        let response = json!({
            "key": "PROJ-42",
            "fields": {
                "summary": "Fix the flux capacitor",
                "status": { "name": "In Progress" },
                "issuetype": { "name": "Bug" },
                "priority": { "name": "High" },
                "assignee": { "displayName": "Dana" },
                "reporter": { "displayName": "Sam" },
                "labels": ["backend", "urgent"],
                "created": "2024-01-15T10:30:00.000+0000",
                "description": {
                    "type": "doc",
                    "version": 1,
                    "content": []
                }
            }
        });

        let issue = JiraIssue::from_response(&response).unwrap();
        assert_eq!(issue.key, "PROJ-42");
        assert_eq!(issue.summary, "Fix the flux capacitor");
        assert_eq!(issue.status, "In Progress");
        assert_eq!(issue.issue_type, "Bug");
        assert_eq!(issue.priority.as_deref(), Some("High"));
        assert_eq!(issue.labels, vec!["backend", "urgent"]);
        assert!(issue.description.is_some());
    }

    #[test]
    fn test_issue_without_key_is_malformed() {
        let response = json!({ "fields": { "summary": "orphan" } });
        assert!(matches!(
            JiraIssue::from_response(&response),
            Err(JiraError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_comment_parsing_defaults() {
        let comment = JiraComment::from_response(&json!({
            "id": "1001",
            "body": { "type": "doc", "version": 1, "content": [] }
        }));
        assert_eq!(comment.id, "1001");
        assert_eq!(comment.author, "Unknown");
        assert!(comment.created.is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"errorMessages":["Issue does not exist"],"errors":{"summary":"Required"}}"#;
        let message = error_message(body.to_string(), StatusCode::BAD_REQUEST);
        assert!(message.contains("Issue does not exist"));
        assert!(message.contains("summary: Required"));
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        let message = error_message(String::new(), StatusCode::BAD_GATEWAY);
        assert!(message.contains("502"));
    }

    #[test]
    fn test_attachment_parsing() {
        let attachment = JiraAttachment::from_response(&json!({
            "id": "2002",
            "filename": "log.txt",
            "size": 2048,
            "mimeType": "text/plain",
            "author": { "displayName": "Dana" }
        }));
        assert_eq!(attachment.filename, "log.txt");
        assert_eq!(attachment.size, 2048);
        assert_eq!(attachment.mime_type, "text/plain");
    }
}
