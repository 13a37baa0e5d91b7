use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, McpTransport};

#[derive(Parser, Debug)]
#[command(name = "computer-use-mcp")]
#[command(version)]
#[command(about = "Mouse, keyboard and screenshot actions over MCP and REST", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/computer-use-mcp.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long, action, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the REST tool server against the local display
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// X11 display
        #[arg(short, long)]
        display: Option<String>,
    },

    /// Run the MCP server
    Mcp {
        /// Transport to serve the protocol on
        #[arg(short, long, value_enum)]
        transport: Option<McpTransport>,

        /// Bind address (http transport)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (http transport)
        #[arg(short, long)]
        port: Option<u16>,

        /// Forward actions to this tool server instead of the local display
        #[arg(long)]
        remote: Option<String>,

        /// X11 display
        #[arg(short, long)]
        display: Option<String>,
    },
}

impl Args {
    pub fn load_config(&self) -> Result<config::Config, config::ConfigError> {
        config::Config::load(&self.config)
    }

    /// Overlay command line flags on `config`.
    pub fn apply(&self, config: &mut config::Config) {
        match &self.command {
            Command::Serve { host, port, display } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(display) = display {
                    config.input.display = Some(display.clone());
                }
            }
            Command::Mcp {
                transport,
                host,
                port,
                remote,
                display,
            } => {
                if let Some(transport) = transport {
                    config.mcp.transport = *transport;
                }
                if let Some(host) = host {
                    config.mcp.host = host.clone();
                }
                if let Some(port) = port {
                    config.mcp.port = *port;
                }
                if let Some(remote) = remote {
                    config.mcp.remote_endpoint = Some(remote.clone());
                }
                if let Some(display) = display {
                    config.input.display = Some(display.clone());
                }
            }
        }
    }
}
