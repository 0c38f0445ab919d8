use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::mcp::errors::{MCPError, MCPResult};
use crate::mcp::tools::{ExecutionContext, MCPTool, ToolError, ToolResult};

/// Tool registry: owns every registered tool, validates call parameters
/// against the tool's schema and tracks per-tool usage statistics.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
    statistics: RwLock<HashMap<String, ToolStatistics>>,
    config: ToolRegistryConfig,
}

struct RegisteredTool {
    tool: Box<dyn MCPTool>,
    /// Raw schema, echoed back on `tools/list`.
    schema: Value,
    /// Compiled validator for the schema above.
    validator: JSONSchema,
}

/// Tool information for MCP client discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Per-tool execution statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolStatistics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub total_execution_time: Duration,
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct ToolRegistryConfig {
    /// Timeout applied to every tool execution.
    pub default_timeout: Duration,

    /// Whether to validate call parameters against the tool schema.
    pub validate_parameters: bool,
}

impl Default for ToolRegistryConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            validate_parameters: true,
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_config(ToolRegistryConfig::default())
    }

    pub fn with_config(config: ToolRegistryConfig) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            statistics: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new tool. Fails on duplicate names and schemas that do not
    /// compile.
    pub async fn register_tool(&self, tool: Box<dyn MCPTool>) -> MCPResult<()> {
        let name = tool.name().to_string();
        if name.is_empty() {
            return Err(MCPError::Validation("Tool name cannot be empty".to_string()));
        }

        let schema = tool.input_schema();
        if !schema.is_object() {
            return Err(MCPError::Validation(format!(
                "Input schema for tool '{name}' must be a JSON object"
            )));
        }
        let validator = JSONSchema::compile(&schema).map_err(|e| {
            MCPError::Validation(format!("Input schema for tool '{name}' does not compile: {e}"))
        })?;

        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(MCPError::Validation(format!(
                "Tool '{name}' is already registered"
            )));
        }

        tools.insert(name.clone(), RegisteredTool {
            tool,
            schema,
            validator,
        });

        debug!("Registered tool: {}", name);
        Ok(())
    }

    /// List every registered tool for client discovery, sorted by name so
    /// `tools/list` output is stable.
    pub async fn list_tools(&self) -> Vec<ToolInfo> {
        let tools = self.tools.read().await;
        let mut infos: Vec<ToolInfo> = tools
            .values()
            .map(|registered| ToolInfo {
                name: registered.tool.name().to_string(),
                description: registered.tool.description().to_string(),
                input_schema: registered.schema.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Execute a tool by name with the given parameters.
    pub async fn execute_tool(
        &self,
        name: &str,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let started = Instant::now();

        let tools = self.tools.read().await;
        let registered = tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if self.config.validate_parameters {
            Self::validate_params(registered, &params)?;
        }

        let outcome = tokio::time::timeout(
            self.config.default_timeout,
            registered.tool.execute(params, context),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("Tool '{}' timed out", name);
                Err(ToolError::Timeout {
                    timeout_ms: self.config.default_timeout.as_millis() as u64,
                })
            }
        };

        self.record_execution(name, result.is_ok(), started.elapsed())
            .await;
        result
    }

    /// Get the statistics recorded for one tool, if it has executed.
    pub async fn get_tool_statistics(&self, name: &str) -> Option<ToolStatistics> {
        self.statistics.read().await.get(name).cloned()
    }

    /// Total number of registered tools.
    pub async fn tool_count(&self) -> usize {
        self.tools.read().await.len()
    }

    fn validate_params(registered: &RegisteredTool, params: &Value) -> Result<(), ToolError> {
        if let Err(errors) = registered.validator.validate(params) {
            let details: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ToolError::InvalidParams(details.join("; ")));
        }
        Ok(())
    }

    async fn record_execution(&self, name: &str, success: bool, elapsed: Duration) {
        let mut statistics = self.statistics.write().await;
        let entry = statistics.entry(name.to_string()).or_default();
        entry.total_executions += 1;
        if success {
            entry.successful_executions += 1;
        }
        entry.total_execution_time += elapsed;
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
