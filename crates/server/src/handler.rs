//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker registration.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    cache::{clear_impl, reset_impl, stores_impl},
    sw_fetch::{SwFetchParams, fetch_impl},
    worker_status::status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheServer {
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state), tool_router: Self::tool_router() }
    }

    /// Dispatch a request through the active worker.
    ///
    /// No-cache paths go to the network first; everything else is served
    /// from the current store when present.
    #[tool(
        description = "Fetch a URL through the cache worker. Relative paths resolve against the configured origin. Reports whether the response came from the network or a cache store."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Ask the active worker to delete every cache store. Returns {success} or {success:false,error}.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.state).await
    }

    #[tool(description = "List cache stores with their entry counts and the name of the current store.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        stores_impl(&self.state).await
    }

    #[tool(description = "Report the active worker's version, lifecycle state, no-cache paths and controlled clients.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    /// Unregister, wipe every store, and install a fresh worker.
    #[tool(description = "Unregister the worker, delete every cache store, then install a fresh worker.")]
    async fn cache_reset(&self) -> Result<CallToolResult, McpError> {
        reset_impl(&self.state).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
