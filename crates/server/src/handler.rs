//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to
//! worker events or cache operations.

use std::sync::Arc;

use crate::tools::{
    cache::{CacheGetParams, CachePurgeParams, get_impl, partitions_impl, purge_impl},
    events::{SwNotificationClickParams, SwPushParams, SwSyncParams, notification_click_impl, push_impl, sync_impl},
    fetch::{SwFetchParams, fetch_impl},
    lifecycle::{activate_impl, install_impl},
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
use soluce_client::OfflineWorker;
use soluce_core::CacheDb;

/// The MCP server handler hosting one offline worker.
#[derive(Clone)]
pub struct SoluceSwServer {
    worker: Arc<OfflineWorker>,
    cache: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SoluceSwServer {
    /// Create a new server handler around a worker and the cache it writes to.
    pub fn new(worker: Arc<OfflineWorker>, cache: CacheDb) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Dispatch the install event: precache the app shell and static assets, then activate at once."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Dispatch the activate event: drop other versions' partitions and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Intercept a request through the worker.
    ///
    /// GET requests are classified and answered by a caching strategy; other
    /// requests go to the network and are queued for background sync when offline.
    #[tool(
        description = "Issue a request through the offline worker. Returns the response and its classification."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dispatch a sync event. The 'background-sync' tag replays writes queued while offline.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dispatch a push event with an optional JSON payload and show the resulting notification.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Dispatch a notification click. Actions are logged; otherwise a window is focused or opened."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Look up the cached response for a GET request URL, optionally within one partition.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, &self.worker.config().origin, params.0).await
    }

    #[tool(
        description = "Purge cache entries by age or count, optionally in one partition. A lone partition is deleted."
    )]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.cache, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts and whether they belong to the running version.")]
    async fn cache_partitions(&self) -> Result<CallToolResult, McpError> {
        partitions_impl(&self.cache, &self.worker.config().cache_names).await
    }
}

impl ServerHandler for SoluceSwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "soluce-sw".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::harness;

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let h = harness().await;
        let server = SoluceSwServer::new(Arc::new(h.worker), h.db);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_partitions",
                "cache_purge",
                "sw_activate",
                "sw_fetch",
                "sw_install",
                "sw_notification_click",
                "sw_push",
                "sw_sync",
            ]
        );
    }
}
