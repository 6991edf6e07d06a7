//! MCP server handler implementation.
//!
//! Routes tool calls to the worker host.
use std::sync::Arc;

use crate::host::WorkerHost;
use crate::tools::cache::list_impl;
use crate::tools::worker::{
    WorkerClientsParams, WorkerFetchParams, WorkerInstallParams, activate_impl, clients_impl, fetch_impl,
    install_impl, status_impl,
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

/// The MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    host: Arc<WorkerHost>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShellcacheServer {
    pub fn new(host: Arc<WorkerHost>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Install a worker generation: precache the app shell into a versioned cache and activate it when the major version allows."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host, params.0).await
    }

    #[tool(description = "Activate the waiting worker generation if no clients are controlled.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    #[tool(description = "Record a client page opening (claim) or closing (release).")]
    async fn worker_clients(&self, params: Parameters<WorkerClientsParams>) -> Result<CallToolResult, McpError> {
        clients_impl(&self.host, params.0).await
    }

    /// Font hosts are served cache-first with write-through; everything else
    /// prefers any cache and falls back to the network.
    #[tool(description = "Route a request through the active worker. Returns status, content type, source and body.")]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Show the active and waiting worker generations and the client count.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(self.host.registration())
    }

    #[tool(description = "List caches in creation order with entry counts.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.host.db()).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
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
