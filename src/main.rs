//! computer-use-mcp - Main entry point
//!
//! Serves mouse, keyboard and screenshot actions over MCP (stdio or
//! Streamable HTTP) or as a REST tool server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};

use computer_use_mcp::args::{Args, Command};
use computer_use_mcp::computer::{Computer, LocalBackend, RemoteBackend, X11Computer};
use computer_use_mcp::config::{Config, McpTransport};
use computer_use_mcp::context::Credential;
use computer_use_mcp::mcp::{self, McpServer};
use computer_use_mcp::web::{self, AppState};
use computer_use_mcp::{logging, Backend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = args.load_config();
    let configured_level = loaded
        .as_ref()
        .map(|cfg| cfg.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    logging::init(&logging::filter(&configured_level, args.verbose));

    info!("computer-use-mcp v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(cfg) => {
            info!("Loaded configuration from {:?}", args.config);
            cfg
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };
    config.apply_env();
    args.apply(&mut config);
    config.validate()?;

    match args.command {
        Command::Serve { .. } => {
            let computer: Arc<dyn Computer> = Arc::new(X11Computer::connect(&config.input)?);
            let state = Arc::new(AppState::new(Arc::new(config), computer));
            web::run_http_server(state).await
        }
        Command::Mcp { .. } => match config.mcp.remote_endpoint.clone() {
            Some(endpoint) => {
                info!("Forwarding actions to {}", endpoint);
                let backend = RemoteBackend::new(
                    Some(endpoint),
                    Duration::from_secs(config.mcp.remote_timeout_secs),
                    Credential::new(&config.auth.api_key),
                )?;
                run_mcp(backend, &config).await
            }
            None => {
                let computer = Arc::new(X11Computer::connect(&config.input)?);
                run_mcp(LocalBackend::new(computer), &config).await
            }
        },
    }
}

async fn run_mcp<B: Backend>(backend: B, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let server = McpServer::new(backend);
    match config.mcp.transport {
        McpTransport::Stdio => mcp::serve_stdio(server).await,
        McpTransport::Http => mcp::serve_http(server, config).await,
    }
}
