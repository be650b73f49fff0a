//! aseprite-mcp - MCP server binary for driving the Aseprite sprite editor

use std::process::ExitCode;

use aseprite_mcp::cli;

#[tokio::main]
async fn main() -> ExitCode {
    cli::run().await
}
