//! Loxone MCP Server - Main Entry Point
//!
//! This server supports two transports:
//! - stdio: the `rmcp` stdio service for Claude Desktop
//! - http: JSON-RPC over POST for MCP Inspector and web clients

use lox_mcp::{
    http_transport,
    logging::{init_logging, LogConfig},
    stdio_transport, LoxoneMcpServer, ServerConfig,
};

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Loxone MCP Server Configuration
#[derive(Parser, Debug)]
#[command(name = "lox-mcp-server")]
#[command(about = "Configuration-driven Loxone MCP Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Config {
    /// Transport configuration
    #[command(subcommand)]
    transport: TransportCommand,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Tool and resource definitions (YAML)
    #[arg(long, global = true, env = "LOXONE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Loxone Miniserver address
    #[arg(long, global = true, env = "LOXONE_HOST")]
    loxone_host: Option<String>,

    /// Loxone username
    #[arg(long, global = true, env = "LOXONE_USER")]
    loxone_user: Option<String>,

    /// Loxone password
    #[arg(long, global = true, env = "LOXONE_PASS", hide_env_values = true)]
    loxone_pass: Option<String>,
}

#[derive(Subcommand, Debug)]
enum TransportCommand {
    /// Run with stdio transport (Claude Desktop)
    Stdio,
    /// Run with HTTP transport (MCP Inspector)
    Http {
        /// Port to listen on
        #[arg(short, long, env = "MCP_PORT", default_value_t = lox_mcp::config::DEFAULT_HTTP_PORT)]
        port: u16,
    },
}

impl Config {
    /// Assemble and validate the server configuration
    fn server_config(&self) -> lox_mcp::Result<ServerConfig> {
        let mut config = ServerConfig::from_values(
            self.loxone_host.clone(),
            self.loxone_user.clone(),
            self.loxone_pass.clone(),
        )?;

        if let Some(path) = &self.config {
            config.definitions_path = Some(path.clone());
        }

        let endpoint = config.validate()?;
        info!("Miniserver endpoint: {endpoint}");
        Ok(config)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Config::parse();

    // Stdout carries the stdio protocol; logs always go to stderr or a file.
    let _log_guard = init_logging(LogConfig::from_env().with_debug(args.debug))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    info!("Starting lox-mcp-server v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.server_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return Err(e.into());
        }
    };

    let server = LoxoneMcpServer::from_config(&config);

    let result = match args.transport {
        TransportCommand::Stdio => {
            tokio::select! {
                result = stdio_transport::run(server.clone()) => result,
                () = shutdown_signal() => Ok(()),
            }
        }
        TransportCommand::Http { port } => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = TcpListener::bind(addr).await?;
            http_transport::serve(server.clone(), listener, shutdown_signal()).await
        }
    };

    server.shutdown().await;

    if let Err(e) = &result {
        error!("Server error: {e}");
    }
    result.map_err(Into::into)
}
