//! MCP server for Loxone control
//!
//! [`LoxoneMcpServer`] implements the `rmcp` [`ServerHandler`] over the
//! registry and the dispatchers. The stdio transport hands it to `rmcp`
//! directly; the HTTP transport routes JSON-RPC to the same operations.

pub mod registry;
pub mod resources;
pub mod tools;

use crate::adapter::LoxoneAdapter;
use crate::config::definitions::McpDefinitions;
use crate::config::ServerConfig;
use registry::Registry;
use resources::ResourceDispatcher;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, JsonObject, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::sync::Arc;
use tools::ToolDispatcher;
use tracing::{info, warn};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "lox-mcp-server";

const INSTRUCTIONS: &str = "Controls a Loxone Miniserver. Tools send commands to single \
devices or to every device of a room, type or category. Resources under lox:// describe \
rooms, devices and categories.";

/// Main MCP server for Loxone control
#[derive(Clone)]
pub struct LoxoneMcpServer {
    adapter: Arc<LoxoneAdapter>,
    registry: Arc<Registry>,
}

impl LoxoneMcpServer {
    pub fn new(adapter: Arc<LoxoneAdapter>, definitions: McpDefinitions) -> Self {
        Self {
            adapter,
            registry: Arc::new(Registry::new(definitions)),
        }
    }

    /// Server talking HTTP to the configured Miniserver, with definitions
    /// from the configured path or the bundled document
    pub fn from_config(config: &ServerConfig) -> Self {
        let definitions = McpDefinitions::load_or_bundled(config.definitions_path.as_deref());
        Self::new(
            Arc::new(LoxoneAdapter::from_server_config(config)),
            definitions,
        )
    }

    pub fn adapter(&self) -> &Arc<LoxoneAdapter> {
        &self.adapter
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tools_list(&self) -> ListToolsResult {
        ListToolsResult::with_all_items(self.registry.list_tools())
    }

    pub fn resources_list(&self) -> ListResourcesResult {
        ListResourcesResult::with_all_items(self.registry.list_resources())
    }

    pub fn resource_templates_list(&self) -> ListResourceTemplatesResult {
        ListResourceTemplatesResult::with_all_items(self.registry.list_resource_templates())
    }

    /// Call a tool by name; an unknown name is a failure result
    pub async fn dispatch_tool(&self, name: &str, arguments: &JsonObject) -> CallToolResult {
        info!("Calling tool: {name}");
        match self.registry.tool(name) {
            Some(definition) => {
                ToolDispatcher::new(&self.adapter, definition)
                    .dispatch(arguments)
                    .await
            }
            None => {
                warn!("Unknown tool requested: {name}");
                tools::failure(format!("Unknown tool: {name}"))
            }
        }
    }

    /// Read a resource by URI; a URI no definition serves is a protocol error
    pub async fn dispatch_resource(&self, uri: &str) -> Result<ReadResourceResult, ErrorData> {
        info!("Reading resource: {uri}");
        let definition = self.registry.find_resource(uri).ok_or_else(|| {
            ErrorData::resource_not_found(format!("Resource not found: {uri}"), None)
        })?;

        let contents = ResourceDispatcher::new(&self.adapter, definition)
            .read(uri)
            .await;
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }

    /// Release the Miniserver connection
    pub async fn shutdown(&self) {
        info!("Shutting down Loxone MCP server");
        if let Err(e) = self.adapter.close().await {
            warn!("Error during shutdown: {e}");
        }
    }
}

impl ServerHandler for LoxoneMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info,
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(self.tools_list())
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.unwrap_or_default();
        Ok(self.dispatch_tool(&request.name, &arguments).await)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(self.resources_list())
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(self.resource_templates_list())
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.dispatch_resource(&request.uri).await
    }
}
