//! Shared error taxonomy for command execution and file routing.
//!
//! Argument problems are rejected before any process spawn or filesystem
//! mutation; execution and filesystem failures carry enough context
//! (captured stderr, the offending path) to diagnose from the caller side.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type shared by the executor, the file router, and the tool layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Caller-supplied value failed validation. Never reaches a spawn
    /// or a filesystem write.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The external process exceeded its wall-clock budget on every
    /// permitted attempt.
    #[error("command timed out after {timeout:?} ({attempts} attempt(s))")]
    ExecutionTimeout { timeout: Duration, attempts: u32 },

    /// The external process ran to completion with a nonzero exit code.
    /// Not retried: a deterministic tool error will recur.
    #[error("command failed with exit code {code}: {stderr}")]
    ExecutionFailed { code: i32, stderr: String },

    /// The process could not be started at all (missing binary,
    /// permission denied).
    #[error("failed to spawn '{executable}': {reason}")]
    SpawnFailure { executable: PathBuf, reason: String },

    /// Destination file already exists and overwrite was not permitted.
    #[error("destination file already exists: {0} (pass overwrite=true to replace)")]
    PathConflict(PathBuf),

    /// A write probe or file operation was refused by the filesystem.
    #[error("permission denied for {path}: {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    /// Route source file does not exist or is not a regular file.
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Underlying I/O failure with no more specific classification.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Helper for the common "bad value for field X" case.
    pub fn invalid(msg: impl Into<String>) -> Self {
        ToolError::InvalidArgument(msg.into())
    }
}
