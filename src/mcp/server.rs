//! Core MCP server implementation.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};

use crate::config::Config;
use crate::error::ToolError;
use crate::exec::Executor;
use crate::mcp::tools::{canvas, drawing, export, routing};
use crate::router::FileRouter;

/// The Aseprite MCP Server
///
/// Exposes canvas, drawing, export, and file-routing operations as MCP
/// tools. All drawing happens inside a headless Aseprite subprocess;
/// this server marshals arguments, runs the binary under a time budget,
/// and routes the resulting files.
#[derive(Clone)]
pub struct AsepriteMcpServer {
    executor: Arc<Executor>,
    router: Arc<FileRouter>,
    tool_router: ToolRouter<Self>,
}

fn reply(result: Result<String, ToolError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(message) => Ok(CallToolResult::success(vec![Content::text(message)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
    }
}

#[tool_router]
impl AsepriteMcpServer {
    pub fn new(config: &Config) -> Self {
        AsepriteMcpServer {
            executor: Arc::new(Executor::from_config(config)),
            router: Arc::new(FileRouter::from_config(config)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Create a new Aseprite canvas with the given pixel dimensions")]
    async fn create_canvas(
        &self,
        Parameters(input): Parameters<canvas::CreateCanvasInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(canvas::run_create_canvas(&self.executor, input).await)
    }

    #[tool(description = "Add a named layer to an Aseprite project file")]
    async fn add_layer(
        &self,
        Parameters(input): Parameters<canvas::AddLayerInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(canvas::run_add_layer(&self.executor, input).await)
    }

    #[tool(description = "Add a new frame to an Aseprite project file")]
    async fn add_frame(
        &self,
        Parameters(input): Parameters<canvas::AddFrameInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(canvas::run_add_frame(&self.executor, input).await)
    }

    #[tool(description = "Report dimensions, layers, frames, and color mode of a project file")]
    async fn get_canvas_info(
        &self,
        Parameters(input): Parameters<canvas::CanvasInfoInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(canvas::run_canvas_info(&self.executor, input).await)
    }

    #[tool(description = "Draw individual pixels, each with its own hex color")]
    async fn draw_pixels(
        &self,
        Parameters(input): Parameters<drawing::DrawPixelsInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(drawing::run_draw_pixels(&self.executor, input).await)
    }

    #[tool(description = "Draw a line between two points with optional thickness")]
    async fn draw_line(
        &self,
        Parameters(input): Parameters<drawing::DrawLineInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(drawing::run_draw_line(&self.executor, input).await)
    }

    #[tool(description = "Draw an outlined or filled rectangle")]
    async fn draw_rectangle(
        &self,
        Parameters(input): Parameters<drawing::DrawRectangleInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(drawing::run_draw_rectangle(&self.executor, input).await)
    }

    #[tool(description = "Draw an outlined or filled circle")]
    async fn draw_circle(
        &self,
        Parameters(input): Parameters<drawing::DrawCircleInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(drawing::run_draw_circle(&self.executor, input).await)
    }

    #[tool(description = "Flood-fill an area from a point with the paint bucket tool")]
    async fn fill_area(
        &self,
        Parameters(input): Parameters<drawing::FillAreaInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(drawing::run_fill_area(&self.executor, input).await)
    }

    #[tool(description = "Export a project file to a standard image format")]
    async fn export_sprite(
        &self,
        Parameters(input): Parameters<export::ExportSpriteInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(export::run_export_sprite(&self.executor, input).await)
    }

    #[tool(description = "Export a project file as a gif or webp animation")]
    async fn export_animation(
        &self,
        Parameters(input): Parameters<export::ExportAnimationInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(export::run_export_animation(&self.executor, input).await)
    }

    #[tool(description = "Export a project file as a sprite sheet with a chosen layout")]
    async fn export_spritesheet(
        &self,
        Parameters(input): Parameters<export::ExportSpritesheetInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(export::run_export_spritesheet(&self.executor, input).await)
    }

    #[tool(description = "Route a finished file to an output directory with conflict and permission checks")]
    async fn route_file(
        &self,
        Parameters(input): Parameters<routing::RouteFileInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(routing::run_route_file(&self.router, input))
    }

    #[tool(description = "Validate an output directory: existence, writability, free space")]
    async fn validate_output_directory(
        &self,
        Parameters(input): Parameters<routing::ValidateDirectoryInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(routing::run_validate_directory(&self.router, input))
    }

    #[tool(description = "List files in an output directory, filtered by glob and sorted")]
    async fn list_output_files(
        &self,
        Parameters(input): Parameters<routing::ListFilesInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(routing::run_list_files(&self.router, input))
    }

    #[tool(description = "Scaffold an organized directory tree (by_type, by_date, or by_project) for routing into")]
    async fn create_organized_structure(
        &self,
        Parameters(input): Parameters<routing::CreateStructureInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(routing::run_create_structure(&self.router, input))
    }

    #[tool(description = "Delete (or dry-run report) files older than a given age in an output directory")]
    async fn cleanup_output_directory(
        &self,
        Parameters(input): Parameters<routing::CleanupInput>,
    ) -> Result<CallToolResult, McpError> {
        reply(routing::run_cleanup(&self.router, input))
    }
}

#[tool_handler]
impl ServerHandler for AsepriteMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "aseprite-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Aseprite MCP server — create canvases, draw primitives, export \
                 sprites and animations, and route finished files to output \
                 directories. Drawing happens in a headless Aseprite process; \
                 configure its path via ASEPRITE_PATH or aseprite-mcp.toml."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server on stdin/stdout
pub async fn run_server(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let server = AsepriteMcpServer::new(config);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
