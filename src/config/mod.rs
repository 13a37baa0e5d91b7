//! Configuration management for computer-use-mcp

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Tool-protocol transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    #[default]
    Stdio,
    Http,
}

impl McpTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            McpTransport::Stdio => "stdio",
            McpTransport::Http => "http",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(McpTransport::Stdio),
            "http" | "streamable-http" | "streamable_http" => Some(McpTransport::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST tool server
    #[serde(default)]
    pub server: ServerConfig,

    /// Tool-protocol server
    #[serde(default)]
    pub mcp: McpConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Device input and capture
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Prefix in front of `/computer/{action}`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_server_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_mcp_port")]
    pub port: u16,

    #[serde(default)]
    pub transport: McpTransport,

    /// REST tool server to forward actions to. Unset means local devices.
    #[serde(default)]
    pub remote_endpoint: Option<String>,

    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mcp_port(),
            transport: McpTransport::default(),
            remote_endpoint: None,
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key_enabled: bool,

    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// X display name; `None` uses `$DISPLAY`
    #[serde(default = "default_display")]
    pub display: Option<String>,

    /// Pixels between drag path points
    #[serde(default = "default_drag_step")]
    pub drag_step: u32,

    /// Pause between drag moves
    #[serde(default = "default_mouse_operate_interval_ms")]
    pub mouse_operate_interval_ms: u64,

    /// Wheel clicks per scroll step
    #[serde(default = "default_scroll_scale")]
    pub scroll_scale: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            display: default_display(),
            drag_step: default_drag_step(),
            mouse_operate_interval_ms: default_mouse_operate_interval_ms(),
            scroll_scale: default_scroll_scale(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or env_logger filter string
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay `COMPUTER_USE_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = var("COMPUTER_USE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&var, "COMPUTER_USE_PORT") {
            self.server.port = port;
        }
        if let Some(host) = var("COMPUTER_USE_MCP_HOST") {
            self.mcp.host = host;
        }
        if let Some(port) = parse_var(&var, "COMPUTER_USE_MCP_PORT") {
            self.mcp.port = port;
        }
        if let Some(raw) = var("COMPUTER_USE_MCP_TRANSPORT") {
            match McpTransport::parse(&raw) {
                Some(transport) => self.mcp.transport = transport,
                None => warn!("Invalid value for COMPUTER_USE_MCP_TRANSPORT: {}", raw),
            }
        }
        if let Some(endpoint) = var("COMPUTER_USE_REMOTE_ENDPOINT") {
            self.mcp.remote_endpoint = Some(endpoint);
        }
        if let Some(raw) = var("COMPUTER_USE_API_KEY_ENABLED") {
            match parse_bool(&raw) {
                Some(enabled) => self.auth.api_key_enabled = enabled,
                None => warn!("Invalid boolean for COMPUTER_USE_API_KEY_ENABLED: {}", raw),
            }
        }
        if let Some(key) = var("COMPUTER_USE_API_KEY") {
            self.auth.api_key = key;
        }
        if let Some(display) = var("DISPLAY") {
            self.input.display = Some(display);
        }
        if let Some(step) = parse_var(&var, "COMPUTER_USE_DRAG_STEP") {
            self.input.drag_step = step;
        }
        if let Some(ms) = parse_var(&var, "COMPUTER_USE_MOUSE_INTERVAL_MS") {
            self.input.mouse_operate_interval_ms = ms;
        }
        if let Some(scale) = parse_var(&var, "COMPUTER_USE_SCROLL_SCALE") {
            self.input.scroll_scale = scale;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.port == 0 || self.mcp.port == 0 {
            return invalid("Ports must be non-zero");
        }
        if !self.server.api_prefix.is_empty() && !self.server.api_prefix.starts_with('/') {
            return invalid("server.api_prefix must start with '/'");
        }
        if self.server.api_prefix.ends_with('/') {
            return invalid("server.api_prefix must not end with '/'");
        }
        if self.auth.api_key_enabled && self.auth.api_key.is_empty() {
            return invalid("API key auth is enabled but auth.api_key is empty");
        }
        if self.input.drag_step == 0 {
            return invalid("input.drag_step must be non-zero");
        }
        if self.input.scroll_scale == 0 {
            return invalid("input.scroll_scale must be non-zero");
        }
        if self.mcp.remote_timeout_secs == 0 {
            return invalid("mcp.remote_timeout_secs must be non-zero");
        }
        if let Some(endpoint) = &self.mcp.remote_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return invalid("mcp.remote_endpoint must be an http:// or https:// URL");
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Invalid value for {}: {}", key, raw);
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}


fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_mcp_port() -> u16 {
    8001
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_remote_timeout_secs() -> u64 {
    30
}

fn default_display() -> Option<String> {
    Some(":0".to_string())
}

fn default_drag_step() -> u32 { 30 }
fn default_mouse_operate_interval_ms() -> u64 { 100 }
fn default_scroll_scale() -> u32 { 1 }

fn default_log_level() -> String {
    "info".to_string()
}
