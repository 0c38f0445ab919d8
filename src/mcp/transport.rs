use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::mcp::{
    errors::{MCPError, MCPResult, TransportError},
    protocol::{MCPMessage, MessageParser},
};

/// Transport types supported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Stdio,
    WebSocket,
}

/// Abstract transport for MCP communication. One instance corresponds to one
/// client connection.
#[async_trait]
pub trait MCPTransport: Send + Sync {
    /// Send a message through the transport.
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()>;

    /// Receive the next message from the transport.
    async fn receive(&mut self) -> MCPResult<MCPMessage>;

    /// Close the transport connection.
    async fn close(&mut self) -> MCPResult<()>;

    /// Check whether the transport is still connected.
    fn is_connected(&self) -> bool;

    fn transport_type(&self) -> TransportType;
}

/// Channel plumbing shared by both transport implementations: the reader task
/// feeds parsed messages into `incoming`, the writer task drains `outgoing`.
struct TransportChannels {
    outgoing: mpsc::UnboundedSender<MCPMessage>,
    incoming: mpsc::UnboundedReceiver<MCPMessage>,
    is_connected: Arc<RwLock<bool>>,
}

impl TransportChannels {
    fn send(&self, message: MCPMessage, transport_name: &str) -> MCPResult<()> {
        self.outgoing.send(message).map_err(|_| {
            MCPError::Transport(TransportError::ConnectionLost(format!(
                "{transport_name} sender channel closed"
            )))
        })
    }

    async fn receive(&mut self, transport_name: &str) -> MCPResult<MCPMessage> {
        self.incoming.recv().await.ok_or_else(|| {
            MCPError::Transport(TransportError::ConnectionLost(format!(
                "{transport_name} receiver channel closed"
            )))
        })
    }

    fn connected(&self) -> bool {
        self.is_connected
            .try_read()
            .map(|guard| *guard)
            .unwrap_or(false)
    }
}

/// Newline-delimited JSON over stdin/stdout. This is the default transport
/// for agent hosts that spawn the server as a subprocess; stdout carries the
/// protocol, so all logging must go elsewhere.
pub struct StdioTransport {
    channels: TransportChannels,
}

impl StdioTransport {
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<MCPMessage>();
        let is_connected = Arc::new(RwLock::new(true));

        let writer_connected = is_connected.clone();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;

            let mut stdout = tokio::io::stdout();
            while let Some(message) = outgoing_rx.recv().await {
                let mut frame = match MessageParser::serialize_message(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                };
                frame.push(b'\n');

                if let Err(e) = stdout.write_all(&frame).await {
                    error!("Failed to write to stdout: {}", e);
                    *writer_connected.write().await = false;
                    break;
                }
                if let Err(e) = stdout.flush().await {
                    error!("Failed to flush stdout: {}", e);
                    *writer_connected.write().await = false;
                    break;
                }
            }
        });

        let reader_connected = is_connected.clone();
        tokio::spawn(async move {
            use tokio::io::{AsyncBufReadExt, BufReader};

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match MessageParser::parse_message(line.as_bytes()) {
                    Ok(message) => {
                        if incoming_tx.send(message).is_err() {
                            warn!("Receiver dropped, closing stdio transport");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse message from stdin: {}", e);
                    }
                }
            }
            *reader_connected.write().await = false;
        });

        Self {
            channels: TransportChannels {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
                is_connected,
            },
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()> {
        if !self.is_connected() {
            return Err(MCPError::Transport(TransportError::Closed));
        }
        self.channels.send(message, "stdio")
    }

    async fn receive(&mut self) -> MCPResult<MCPMessage> {
        self.channels.receive("stdio").await
    }

    async fn close(&mut self) -> MCPResult<()> {
        *self.channels.is_connected.write().await = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.channels.connected()
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }
}

/// WebSocket transport for hosts connecting over TCP.
pub struct WebSocketTransport {
    channels: TransportChannels,
}

impl WebSocketTransport {
    /// Accept a WebSocket handshake on the given TCP stream.
    pub async fn new(stream: tokio::net::TcpStream) -> MCPResult<Self> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| MCPError::Transport(TransportError::WebSocket(e)))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<MCPMessage>();
        let is_connected = Arc::new(RwLock::new(true));

        let writer_connected = is_connected.clone();
        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let json_data = match MessageParser::serialize_message(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                };

                let frame = WsMessage::Text(String::from_utf8_lossy(&json_data).to_string());
                if let Err(e) = ws_sender.send(frame).await {
                    error!("Failed to send WebSocket message: {}", e);
                    *writer_connected.write().await = false;
                    break;
                }
            }
        });

        let reader_connected = is_connected.clone();
        tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                let payload = match frame {
                    Ok(WsMessage::Text(text)) => text.into_bytes(),
                    Ok(WsMessage::Binary(data)) => data,
                    Ok(WsMessage::Close(_)) => {
                        info!("WebSocket connection closed by client");
                        break;
                    }
                    Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                        // Pong replies are handled by tungstenite itself.
                        continue;
                    }
                    Ok(WsMessage::Frame(_)) => {
                        debug!("Ignoring raw frame");
                        continue;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                };

                match MessageParser::parse_message(&payload) {
                    Ok(message) => {
                        if incoming_tx.send(message).is_err() {
                            warn!("Receiver dropped, closing WebSocket connection");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse MCP message: {}", e);
                    }
                }
            }
            *reader_connected.write().await = false;
        });

        Ok(Self {
            channels: TransportChannels {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
                is_connected,
            },
        })
    }
}

#[async_trait]
impl MCPTransport for WebSocketTransport {
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()> {
        if !self.is_connected() {
            return Err(MCPError::Transport(TransportError::Closed));
        }
        self.channels.send(message, "WebSocket")
    }

    async fn receive(&mut self) -> MCPResult<MCPMessage> {
        self.channels.receive("WebSocket").await
    }

    async fn close(&mut self) -> MCPResult<()> {
        *self.channels.is_connected.write().await = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.channels.connected()
    }

    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }
}

/// Transport factory for creating boxed transport instances.
pub struct TransportFactory;

impl TransportFactory {
    pub fn create_stdio() -> Box<dyn MCPTransport> {
        Box::new(StdioTransport::new())
    }

    pub async fn create_websocket(
        stream: tokio::net::TcpStream,
    ) -> MCPResult<Box<dyn MCPTransport>> {
        let transport = WebSocketTransport::new(stream).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_types_are_distinct() {
        assert_ne!(TransportType::Stdio, TransportType::WebSocket);
    }

    #[tokio::test]
    async fn test_stdio_transport_reports_connected() {
        let mut transport = StdioTransport::new();
        assert!(transport.is_connected());
        assert_eq!(transport.transport_type(), TransportType::Stdio);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let mut transport = StdioTransport::new();
        transport.close().await.unwrap();

        let message = MCPMessage::request("ping", None);
        assert!(transport.send(message).await.is_err());
    }

    #[test]
    fn test_message_frame_round_trip() {
        let message = MCPMessage::request("tools/list", Some(json!({"cursor": null})));
        let serialized = MessageParser::serialize_message(&message).unwrap();
        let parsed = MessageParser::parse_message(&serialized).unwrap();

        assert_eq!(message.method, parsed.method);
        assert_eq!(message.params, parsed.params);
    }
}
