use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::jira_client::JiraClient;
use crate::mcp::{
    MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
    errors::{JsonRpcError, MCPError, MCPResult, ServerError},
    protocol::{
        InitializeParams, InitializeResult, MCPMessage, MCPRequest, ServerCapabilities,
        ServerInfo, ToolsCapability,
    },
    tools::{
        ExecutionContext, ToolError, ToolRegistry, ToolResult,
        jira::{
            AddCommentTool, CreateIssueTool, DeleteIssueTool, DownloadAttachmentTool,
            GetCommentsTool, GetIssueTool, ListAttachmentsTool, ListProjectsTool,
            SearchIssuesTool, TransitionIssueTool, UpdateIssueTool, UploadAttachmentTool,
        },
    },
    transport::{MCPTransport, TransportFactory},
};

/// MCP server configuration.
#[derive(Debug, Clone)]
pub struct MCPServerConfig {
    /// Timeout for a single tool execution.
    pub tool_timeout: Duration,

    /// Instructions string advertised to the client on initialize.
    pub instructions: Option<String>,
}

impl Default for MCPServerConfig {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(60),
            instructions: Some(
                "Jira tools: issue CRUD, JQL search, comments, attachments, projects and \
                 workflow transitions. Descriptions and comment bodies accept markdown-style \
                 formatting."
                    .to_string(),
            ),
        }
    }
}

/// Server statistics, logged at connection close.
#[derive(Debug, Clone, Default)]
pub struct ServerStatistics {
    pub total_connections: u64,
    pub total_messages: u64,
    pub total_tool_executions: u64,
    pub error_count: u64,
}

/// MCP server: owns the tool registry and the shared Jira client, and runs
/// the per-connection message loop.
pub struct MCPServer {
    config: MCPServerConfig,
    registry: ToolRegistry,
    context: ExecutionContext,
    stats: Mutex<ServerStatistics>,
}

impl MCPServer {
    /// Create a server and register the built-in Jira tool set.
    pub async fn new(config: MCPServerConfig, jira: Arc<JiraClient>) -> MCPResult<Self> {
        let registry = ToolRegistry::with_config(crate::mcp::tools::registry::ToolRegistryConfig {
            default_timeout: config.tool_timeout,
            ..Default::default()
        });
        Self::register_builtin_tools(&registry).await?;

        Ok(Self {
            config,
            registry,
            context: ExecutionContext::new(jira),
            stats: Mutex::new(ServerStatistics::default()),
        })
    }

    async fn register_builtin_tools(registry: &ToolRegistry) -> MCPResult<()> {
        registry.register_tool(Box::new(GetIssueTool)).await?;
        registry.register_tool(Box::new(CreateIssueTool)).await?;
        registry.register_tool(Box::new(UpdateIssueTool)).await?;
        registry.register_tool(Box::new(DeleteIssueTool)).await?;
        registry.register_tool(Box::new(SearchIssuesTool)).await?;
        registry.register_tool(Box::new(AddCommentTool)).await?;
        registry.register_tool(Box::new(GetCommentsTool)).await?;
        registry.register_tool(Box::new(ListAttachmentsTool)).await?;
        registry
            .register_tool(Box::new(DownloadAttachmentTool))
            .await?;
        registry.register_tool(Box::new(UploadAttachmentTool)).await?;
        registry.register_tool(Box::new(ListProjectsTool)).await?;
        registry.register_tool(Box::new(TransitionIssueTool)).await?;

        info!("Registered {} built-in tools", registry.tool_count().await);
        Ok(())
    }

    /// Serve a single connection on stdin/stdout. Returns when the host
    /// closes the pipe.
    pub async fn run_stdio(self: Arc<Self>) -> MCPResult<()> {
        info!("{} v{} serving on stdio", SERVER_NAME, SERVER_VERSION);
        let transport = TransportFactory::create_stdio();
        self.handle_connection(transport, "stdio").await
    }

    /// Accept WebSocket connections on the given port, one task per client.
    pub async fn run_websocket(self: Arc<Self>, port: u16) -> MCPResult<()> {
        let address = format!("127.0.0.1:{port}");
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| {
                MCPError::Server(ServerError::StartupFailed(format!(
                    "Cannot bind {address}: {e}"
                )))
            })?;
        info!("{} v{} listening on ws://{}", SERVER_NAME, SERVER_VERSION, address);

        loop {
            let (stream, peer) = listener.accept().await.map_err(|e| {
                MCPError::Server(ServerError::StartupFailed(format!("Accept failed: {e}")))
            })?;

            let server = self.clone();
            tokio::spawn(async move {
                let connection_id = peer.to_string();
                match TransportFactory::create_websocket(stream).await {
                    Ok(transport) => {
                        if let Err(e) = server.handle_connection(transport, &connection_id).await {
                            error!("Connection {} failed: {}", connection_id, e);
                        }
                    }
                    Err(e) => error!("WebSocket handshake with {} failed: {}", connection_id, e),
                }
            });
        }
    }

    /// Message loop for one connection.
    pub async fn handle_connection(
        &self,
        mut transport: Box<dyn MCPTransport>,
        connection_id: &str,
    ) -> MCPResult<()> {
        info!("New connection: {}", connection_id);
        let started = SystemTime::now();
        self.stats.lock().await.total_connections += 1;

        loop {
            let message = match transport.receive().await {
                Ok(message) => message,
                Err(MCPError::Transport(_)) => {
                    debug!("Connection closed: {}", connection_id);
                    break;
                }
                Err(e) => {
                    error!("Receive error on {}: {}", connection_id, e);
                    break;
                }
            };

            if let Err(e) = self.handle_message(message, &mut transport).await {
                error!("Error handling message on {}: {}", connection_id, e);
                self.stats.lock().await.error_count += 1;
            }

            if !transport.is_connected() {
                break;
            }
        }

        let stats = self.stats.lock().await.clone();
        info!(
            "Connection {} closed after {:?} (messages: {}, tool calls: {}, errors: {})",
            connection_id,
            started.elapsed().unwrap_or_default(),
            stats.total_messages,
            stats.total_tool_executions,
            stats.error_count
        );
        Ok(())
    }

    async fn handle_message(
        &self,
        message: MCPMessage,
        transport: &mut Box<dyn MCPTransport>,
    ) -> MCPResult<()> {
        self.stats.lock().await.total_messages += 1;

        if message.is_request() {
            let request = message.as_request()?;
            let response = self.handle_request(request).await;
            transport.send(response).await?;
        } else if message.is_notification() {
            // The only notification clients send today is
            // notifications/initialized; nothing to do for it.
            if let Ok(notification) = message.as_notification() {
                debug!("Notification: {}", notification.method);
            }
        } else {
            warn!("Ignoring unexpected message type");
        }

        Ok(())
    }

    async fn handle_request(&self, request: MCPRequest) -> MCPMessage {
        debug!("Request: {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_tool_call(request.params).await,
            method => Err(MCPError::Server(ServerError::MethodNotFound(
                method.to_string(),
            ))),
        };

        match result {
            Ok(result) => MCPMessage::response(request.id, Some(result)),
            Err(error) => MCPMessage::error_response(request.id, JsonRpcError::from(error)),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> MCPResult<Value> {
        if let Some(params) = params {
            let init: InitializeParams = serde_json::from_value(params)
                .map_err(|e| MCPError::Server(ServerError::InvalidParams(e.to_string())))?;
            debug!(
                "Client: {} v{} (protocol {})",
                init.client_info.name, init.client_info.version, init.protocol_version
            );
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            instructions: self.config.instructions.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    async fn handle_list_tools(&self) -> MCPResult<Value> {
        let tools = self.registry.list_tools().await;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tool_call(&self, params: Option<Value>) -> MCPResult<Value> {
        let params = params.ok_or_else(|| {
            MCPError::Server(ServerError::InvalidParams("Missing parameters".to_string()))
        })?;

        let tool_name = params["name"].as_str().ok_or_else(|| {
            MCPError::Server(ServerError::InvalidParams("Missing tool name".to_string()))
        })?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        self.stats.lock().await.total_tool_executions += 1;

        let result = match self
            .registry
            .execute_tool(tool_name, arguments, &self.context)
            .await
        {
            Ok(result) => result,
            // Unknown tools and bad parameters are protocol-level errors;
            // everything else is reported inside the result so the host can
            // show it to the model.
            Err(error @ ToolError::NotFound(_)) | Err(error @ ToolError::InvalidParams(_)) => {
                return Err(MCPError::ToolExecution(error));
            }
            Err(error) => {
                warn!("Tool '{}' failed: {}", tool_name, error);
                ToolResult::error(error.to_string())
            }
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Snapshot of the server statistics.
    pub async fn statistics(&self) -> ServerStatistics {
        self.stats.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JiraConfig;
    use serde_json::json;

    async fn test_server() -> MCPServer {
        let config = JiraConfig {
            base_url: "https://example.atlassian.net".to_string(),
            email: "dev@example.com".to_string(),
            api_token: "token".to_string(),
            request_timeout_secs: 5,
            default_max_results: 25,
        };
        let jira = Arc::new(JiraClient::new(config).expect("test client should build"));
        MCPServer::new(MCPServerConfig::default(), jira)
            .await
            .expect("server should build")
    }

    fn request(method: &str, params: Value) -> MCPRequest {
        MCPRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_capabilities() {
        let server = test_server().await;
        let response = server
            .handle_request(request(
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "host", "version": "1.0" }
                }),
            ))
            .await;

        let result = response.result.expect("initialize should succeed");
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_contains_full_tool_set() {
        let server = test_server().await;
        let response = server.handle_request(request("tools/list", json!({}))).await;

        let result = response.result.expect("tools/list should succeed");
        let tools = result["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 12);

        let names: Vec<&str> = tools
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        for expected in [
            "get_issue",
            "create_issue",
            "update_issue",
            "delete_issue",
            "search_issues",
            "add_comment",
            "get_comments",
            "list_attachments",
            "download_attachment",
            "upload_attachment",
            "list_projects",
            "transition_issue",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn test_unknown_method_is_an_error_response() {
        let server = test_server().await;
        let response = server.handle_request(request("bogus/method", json!({}))).await;

        let error = response.error.expect("should be an error");
        assert_eq!(error.code, crate::mcp::errors::JsonRpcErrorCode::MethodNotFound as i32);
    }

    #[tokio::test]
    async fn test_unknown_tool_call_is_an_error_response() {
        let server = test_server().await;
        let response = server
            .handle_request(request("tools/call", json!({"name": "nope", "arguments": {}})))
            .await;
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_invalid_tool_params_are_an_error_response() {
        let server = test_server().await;
        let response = server
            .handle_request(request(
                "tools/call",
                json!({"name": "get_issue", "arguments": {}}),
            ))
            .await;
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_ping_answers_empty_object() {
        let server = test_server().await;
        let response = server.handle_request(request("ping", json!({}))).await;
        assert_eq!(response.result, Some(json!({})));
    }
}
