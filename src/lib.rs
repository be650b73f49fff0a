//! aseprite-mcp - MCP server for driving the Aseprite sprite editor
//!
//! This library provides functionality to:
//! - Run allow-listed Aseprite invocations under a time budget
//! - Generate and execute Lua scripts for canvas and drawing operations
//! - Route finished artifacts to validated output directories

pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod exec;
pub mod lua;
pub mod mcp;
pub mod router;
