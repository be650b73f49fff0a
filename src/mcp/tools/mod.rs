//! MCP tool definitions for aseprite-mcp
//!
//! Each tool is a schemars input struct plus a `run_*` function holding
//! the actual logic, so the logic stays unit-testable without a protocol
//! round trip. The server registers thin `#[tool]` wrappers over these.

use std::path::{Path, PathBuf};

use crate::error::ToolError;

pub mod canvas;
pub mod drawing;
pub mod export;
pub mod routing;

/// Check that a caller-named project file exists before building any
/// script against it.
pub(crate) fn require_file(filename: &str) -> Result<PathBuf, ToolError> {
    let path = Path::new(filename);
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ToolError::SourceNotFound(path.to_path_buf()))
    }
}
