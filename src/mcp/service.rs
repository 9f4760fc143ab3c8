//! MCP service implementation using rmcp.
//!
//! This module defines the GatewayService struct, which answers `tools/list`
//! from the static catalog and forwards every `tools/call` to the dispatcher.
//! Tool failures, unknown tool names included, come back as `isError`
//! results rather than protocol errors.

use crate::db::{ConnectionCache, DatabaseClient, MySqlClient};
use crate::models::ConnectionDefaults;
use crate::tools::Dispatcher;
use crate::tools::catalog;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

pub struct GatewayService<C: DatabaseClient = MySqlClient> {
    /// Routes tool calls to the shared connection cache
    dispatcher: Dispatcher<C>,
}

impl<C: DatabaseClient> Clone for GatewayService<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C: DatabaseClient> GatewayService<C> {
    /// Create a new GatewayService instance.
    ///
    /// # Arguments
    ///
    /// * `cache` - Shared connection cache, also used by the shutdown sequence
    /// * `defaults` - Fallback connection fields for calls that omit them
    pub fn new(cache: Arc<ConnectionCache<C>>, defaults: ConnectionDefaults) -> Self {
        Self {
            dispatcher: Dispatcher::new(cache, defaults),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }
}

impl<C: DatabaseClient> ServerHandler for GatewayService<C> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("MySQL Gateway MCP".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for inspecting and querying MySQL servers.\n\
                \n\
                ## Connection Fields\n\
                Every database tool accepts optional `host`, `port`, `user` and `password`.\n\
                Omitted fields fall back to the gateway's defaults (MYSQL_HOST, MYSQL_PORT,\n\
                MYSQL_USER, MYSQL_PASSWORD). Connections are cached per host, port, user\n\
                and database, and checked for liveness before reuse.\n\
                \n\
                ## Workflow\n\
                1. `show_databases` to see what exists\n\
                2. `show_tables` with `database`\n\
                3. `describe_table` with `database` and `table_name`\n\
                4. `execute_query` with `database` and `query`\n\
                \n\
                ## Record Tools\n\
                `select_records`, `get_record_by_id`, `count_records`, `insert_record`,\n\
                `bulk_insert`, `update_record`, `update_records`, `delete_record` and\n\
                `delete_records` take a `database`, a `table_name` and JSON values, which are\n\
                sent as bound parameters. Bulk updates and deletes need a non-empty `where`;\n\
                `delete_records` also needs `confirm: true`.\n\
                \n\
                ## Notes\n\
                - `execute_query` runs the statement exactly as given, with autocommit.\n\
                - `test_connection` checks credentials and reports the server version.\n\
                - `get_server_info` shows the defaults and timeouts this gateway runs with.\n\
                - Failures are returned as results with isError set; read the Trace line."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move { Ok(ListToolsResult::with_all_items(catalog::tools())) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            debug!(tool = %request.name, "Received tool call");
            let response = self
                .dispatcher
                .dispatch(&request.name, request.arguments)
                .await;
            Ok(response.into())
        }
    }
}
