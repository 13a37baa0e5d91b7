//! MCP (Model Context Protocol) server.
//!
//! Exposes every registered action as a tool over stdio or Streamable HTTP.
//! Calls go through the same [`Dispatcher`] as the REST server; only the
//! rendering differs.

pub mod tools;

use std::error::Error;
use std::sync::Arc;

use axum::{http::request::Parts, middleware, routing::get, Json, Router};
use log::info;
use rmcp::{
    model::*,
    service::RequestContext as McpContext,
    transport::{
        stdio,
        streamable_http_server::{session::local::LocalSessionManager, StreamableHttpService},
    },
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::action::naming::to_canonical;
use crate::computer::Backend;
use crate::config::Config;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::envelope;
use crate::web::http_server::{shutdown_signal, SERVICE_NAME};
use crate::web::middleware::{api_key_middleware, request_id_middleware};
use tools::{build_tools, ENDPOINT_PARAM};

pub struct McpServer<B: Backend> {
    backend: Arc<B>,
    dispatcher: Dispatcher,
    tools: Arc<Vec<Tool>>,
}

impl<B: Backend> Clone for McpServer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            dispatcher: self.dispatcher,
            tools: self.tools.clone(),
        }
    }
}

impl<B: Backend> McpServer<B> {
    pub fn new(backend: B) -> Self {
        let dispatcher = Dispatcher::default();
        let tools = build_tools(dispatcher.registry(), backend.is_remote());
        Self {
            backend: Arc::new(backend),
            dispatcher,
            tools: Arc::new(tools),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_remote()
    }

    /// Run one tool call. `parts` is the HTTP request the call arrived on,
    /// absent for stdio.
    pub async fn handle_call(&self, name: &str, arguments: Option<JsonObject>, parts: Option<&Parts>) -> CallToolResult {
        let ctx = match parts {
            Some(parts) => parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_else(|| RequestContext::from_headers(&parts.headers)),
            None => RequestContext::begin(None),
        };

        let mut params = arguments.unwrap_or_default();
        let endpoint = match params.remove(ENDPOINT_PARAM) {
            Some(Value::String(url)) => Some(url),
            Some(Value::Null) | None => None,
            Some(other) => {
                return envelope::tool_error(&format!("'{ENDPOINT_PARAM}' must be a string, got {other}"));
            }
        };

        ctx.clone()
            .scope(async {
                let computer = match self.backend.bind(&ctx, endpoint.as_deref()) {
                    Ok(computer) => computer,
                    Err(err) => {
                        let canonical = to_canonical(name.trim());
                        return envelope::tool_result(&Err(err.into_dispatch(&canonical)));
                    }
                };
                let result = self.dispatcher.dispatch(&computer, &ctx, name, &params).await;
                envelope::tool_result(&result)
            })
            .await
    }
}

impl<B: Backend> ServerHandler for McpServer<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
                ..Default::default()
            },
            server_info: Implementation {
                name: SERVICE_NAME.into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                description: Some("Mouse, keyboard and screenshot control".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Computer use MCP server. Use take_screenshot and get_screen_size to see the \
                 desktop, then the mouse and keyboard tools to interact with it."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: McpContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.to_vec()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: McpContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let parts = context.extensions.get::<Parts>();
        Ok(self.handle_call(&request.name, request.arguments, parts).await)
    }
}

pub async fn serve_stdio<B: Backend>(server: McpServer<B>) -> Result<(), Box<dyn Error>> {
    info!(
        "MCP server on stdio ({} backend)",
        if server.is_remote() { "remote" } else { "local" }
    );
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Router for the Streamable HTTP transport: the protocol at `/mcp` plus a
/// health check. The API key is checked here only for the local backend;
/// remote calls forward it to the tool server instead.
pub fn http_router<B: Backend>(server: McpServer<B>, config: &Config) -> Router {
    let check_key = config.auth.api_key_enabled && !server.is_remote();
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mut protocol = Router::new().nest_service("/mcp", service);
    if check_key {
        protocol = protocol.layer(middleware::from_fn_with_state(
            Arc::new(config.auth.clone()),
            api_key_middleware,
        ));
    }

    Router::new()
        .route("/health", get(health_handler))
        .merge(protocol)
        .layer(middleware::from_fn(request_id_middleware))
}

pub async fn serve_http<B: Backend>(server: McpServer<B>, config: &Config) -> Result<(), Box<dyn Error>> {
    let addr = format!("{}:{}", config.mcp.host, config.mcp.port);
    let app = http_router(server, config);

    let listener = TcpListener::bind(&addr).await?;
    info!("MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "transport": "http",
    }))
}
