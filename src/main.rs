use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jira_mcp::config::JiraConfig;
use jira_mcp::jira_client::JiraClient;
use jira_mcp::mcp::server::{MCPServer, MCPServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON over stdin/stdout
    Stdio,
    /// WebSocket listener on --port
    Ws,
}

#[derive(Debug, Parser)]
#[command(name = "jira-mcp", about = "MCP server exposing Jira operations as tools")]
struct Args {
    /// Transport to serve on
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// TCP port for the WebSocket transport
    #[arg(long, default_value_t = 9044)]
    port: u16,

    /// Path to the Jira configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for log files when serving on stdio
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // On stdio, stdout carries the protocol; logs have to go to a file.
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _log_guard = match args.transport {
        Transport::Stdio => {
            let appender = tracing_appender::rolling::daily(&args.log_dir, "jira-mcp.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Transport::Ws => {
            tracing_subscriber::fmt().with_env_filter(filter()).init();
            None
        }
    };

    let config = match JiraConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    info!("Configured for {}", config.base_url);

    let jira = match JiraClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Failed to build Jira client: {e}");
            std::process::exit(1);
        }
    };

    let server = match MCPServer::new(MCPServerConfig::default(), jira).await {
        Ok(server) => Arc::new(server),
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    let outcome = match args.transport {
        Transport::Stdio => server.run_stdio().await,
        Transport::Ws => server.run_websocket(args.port).await,
    };

    if let Err(e) = outcome {
        error!("Server terminated with error: {}", e);
        std::process::exit(1);
    }
}
