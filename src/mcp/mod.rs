//! MCP (Model Context Protocol) server implementation for aseprite-mcp
//!
//! Exposes canvas, drawing, export, and file-routing operations as MCP
//! tools backed by a headless Aseprite subprocess. Start the server with
//! `aseprite-mcp serve` (stdio transport).

mod server;
pub mod tools;

pub use server::{run_server, AsepriteMcpServer};
