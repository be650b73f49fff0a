//! File routing tools — move finished artifacts to caller-chosen
//! directories, validate destinations, list and clean up outputs.
//!
//! Thin adapters over [`crate::router::FileRouter`]; formatting aside,
//! all behavior lives there.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ToolError;
use crate::router::{CleanupOptions, FileRouter, RouteRequest, SortKey, StructureLayout};

/// Input parameters for the route_file tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteFileInput {
    /// Path of the finished file to route.
    #[schemars(description = "Path of the finished file to route")]
    pub source_file: String,

    /// Directory to place the file in.
    #[schemars(description = "Directory to place the file in")]
    pub destination_directory: String,

    /// New file name (default: the source's name). Must be a bare name.
    #[schemars(description = "New file name (default: the source's name). Must be a bare name")]
    pub filename: Option<String>,

    /// Replace an existing file at the destination (default: false).
    #[serde(default)]
    #[schemars(description = "Replace an existing file at the destination (default: false)")]
    pub overwrite: bool,

    /// Create the destination directory if missing (default: true).
    #[serde(default = "default_true")]
    #[schemars(description = "Create the destination directory if missing (default: true)")]
    pub create_dirs: bool,

    /// Remove the source after routing instead of copying (default: false).
    #[serde(default)]
    #[schemars(description = "Remove the source after routing instead of copying (default: false)")]
    pub move_source: bool,
}

fn default_true() -> bool {
    true
}

/// Input parameters for the validate_output_directory tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateDirectoryInput {
    /// Directory to validate.
    #[schemars(description = "Directory to validate")]
    pub directory_path: String,

    /// Create the directory (and parents) if missing (default: false).
    #[serde(default)]
    #[schemars(description = "Create the directory (and parents) if missing (default: false)")]
    pub create_if_missing: bool,
}

/// Input parameters for the list_output_files tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesInput {
    /// Directory to list.
    #[schemars(description = "Directory to list")]
    pub directory_path: String,

    /// Glob pattern applied to file names (default: "*").
    #[serde(default = "default_pattern")]
    #[schemars(description = "Glob pattern applied to file names (default: \"*\")")]
    pub pattern: String,

    /// Sort key: name, modified, or size (ascending; default: name).
    #[serde(default = "default_sort")]
    #[schemars(description = "Sort key: name, modified, or size (ascending; default: name)")]
    pub sort_by: String,
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_sort() -> String {
    "name".to_string()
}

/// Input parameters for the cleanup_output_directory tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CleanupInput {
    /// Directory to clean up.
    #[schemars(description = "Directory to clean up")]
    pub directory_path: String,

    /// Glob pattern applied to file names (default: "*").
    #[serde(default = "default_pattern")]
    #[schemars(description = "Glob pattern applied to file names (default: \"*\")")]
    pub pattern: String,

    /// Delete files older than this many days (default: 30).
    #[serde(default = "default_max_age")]
    #[schemars(description = "Delete files older than this many days (default: 30)")]
    pub max_age_days: u64,

    /// Report what would be deleted without deleting (default: true).
    #[serde(default = "default_true")]
    #[schemars(description = "Report what would be deleted without deleting (default: true)")]
    pub dry_run: bool,
}

fn default_max_age() -> u64 {
    30
}

/// Input parameters for the create_organized_structure tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateStructureInput {
    /// Base directory to scaffold the structure in.
    #[schemars(description = "Base directory to scaffold the structure in")]
    pub base_directory: String,

    /// Layout: by_type, by_date, or by_project (default: by_type).
    #[serde(default = "default_structure_type")]
    #[schemars(description = "Layout: by_type, by_date, or by_project (default: by_type)")]
    pub structure_type: String,
}

fn default_structure_type() -> String {
    "by_type".to_string()
}

pub fn run_route_file(router: &FileRouter, input: RouteFileInput) -> Result<String, ToolError> {
    let request = RouteRequest {
        source: PathBuf::from(&input.source_file),
        dest_dir: PathBuf::from(&input.destination_directory),
        filename: input.filename,
        overwrite: input.overwrite,
        create_dirs: input.create_dirs,
        move_source: input.move_source,
    };
    let result = router.route(&request)?;

    let mut lines = vec![
        "File routed successfully!".to_string(),
        format!("Source: {}", input.source_file),
        format!("Destination: {}", result.destination.display()),
        format!("Size: {} bytes", result.bytes_moved),
        format!("Operation: {}", if result.overwrote { "Overwritten" } else { "Created" }),
    ];
    for warning in &result.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    Ok(lines.join("\n"))
}

pub fn run_validate_directory(
    router: &FileRouter,
    input: ValidateDirectoryInput,
) -> Result<String, ToolError> {
    let report =
        router.validate_directory(Path::new(&input.directory_path), input.create_if_missing)?;

    let status = if report.exists && report.writable { "VALID" } else { "INVALID" };
    let mut lines = vec![
        format!("Directory Validation Report: {status}"),
        format!("Path: {}", report.path.display()),
        format!("Exists: {}", report.exists),
        format!("Writable: {}", report.writable),
    ];
    if report.created {
        lines.push("Created by this call".to_string());
    }
    if report.free_space_bytes > 0 {
        lines.push(format!(
            "Available Space: {:.1} MB",
            report.free_space_bytes as f64 / (1024.0 * 1024.0)
        ));
    }
    for warning in &report.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    Ok(lines.join("\n"))
}

pub fn run_list_files(router: &FileRouter, input: ListFilesInput) -> Result<String, ToolError> {
    let sort: SortKey = input.sort_by.parse()?;
    let entries = router.list_files(Path::new(&input.directory_path), &input.pattern, sort)?;

    if entries.is_empty() {
        return Ok(format!(
            "No files matching '{}' in {}",
            input.pattern, input.directory_path
        ));
    }

    let mut lines = vec![format!(
        "{} file(s) matching '{}' in {}:",
        entries.len(),
        input.pattern,
        input.directory_path
    )];
    for entry in &entries {
        lines.push(format!("  {} ({} bytes)", entry.name, entry.size));
    }
    Ok(lines.join("\n"))
}

pub fn run_cleanup(router: &FileRouter, input: CleanupInput) -> Result<String, ToolError> {
    let opts = CleanupOptions {
        pattern: input.pattern.clone(),
        max_age_days: input.max_age_days,
        dry_run: input.dry_run,
    };
    let cancel = AtomicBool::new(false);
    let report = router.cleanup(Path::new(&input.directory_path), &opts, &cancel)?;

    let mut lines = Vec::new();
    if report.dry_run {
        lines.push(format!(
            "Dry run: {} file(s) older than {} day(s) would be deleted",
            report.matched(),
            input.max_age_days
        ));
        for path in &report.candidates {
            lines.push(format!("  would delete {}", path.display()));
        }
    } else {
        lines.push(format!(
            "Deleted {} of {} matched file(s), reclaimed {} bytes",
            report.deleted,
            report.matched(),
            report.bytes_reclaimed
        ));
        for (path, reason) in &report.skipped {
            lines.push(format!("  skipped {}: {reason}", path.display()));
        }
    }
    if report.cancelled {
        lines.push("Cleanup was cancelled before finishing".to_string());
    }
    Ok(lines.join("\n"))
}

pub fn run_create_structure(
    router: &FileRouter,
    input: CreateStructureInput,
) -> Result<String, ToolError> {
    let layout: StructureLayout = input.structure_type.parse()?;
    let report = router.create_structure(Path::new(&input.base_directory), layout)?;

    let mut lines = vec![
        format!("Organized Directory Structure Created: {}", report.layout.as_str()),
        format!("Base Directory: {}", report.base.display()),
        format!("Directories Created: {}", report.created.len()),
        "Structure:".to_string(),
    ];
    for dir in &report.created {
        lines.push(format!("  {}", dir.display()));
    }
    Ok(lines.join("\n"))
}
