pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
/// Model Context Protocol (MCP) server implementation.
///
/// This module exposes the Jira tool set to an AI agent host over JSON-RPC
/// 2.0, on stdio or WebSocket transports.
pub mod transport;

// Re-export core types for easier access
pub use self::{server::MCPServer, tools::MCPTool, transport::MCPTransport};

/// MCP protocol version implemented by this server.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information
pub const SERVER_NAME: &str = "Jira MCP Server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
