//! Export tools — derive standard image/animation artifacts from a
//! project file via Aseprite's batch CLI.

use std::path::Path;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::require_file;
use crate::error::ToolError;
use crate::exec::Executor;

/// Formats `export_sprite` accepts, with human-readable labels.
const SPRITE_FORMATS: &[(&str, &str)] = &[
    ("png", "PNG image"),
    ("gif", "GIF animation"),
    ("jpg", "JPEG image"),
    ("jpeg", "JPEG image"),
    ("bmp", "Bitmap image"),
    ("tga", "Targa image"),
    ("webp", "WebP image"),
];

const ANIMATION_FORMATS: &[&str] = &["gif", "webp"];
const SHEET_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga"];
const SHEET_TYPES: &[&str] = &["horizontal", "vertical", "rows", "columns", "packed"];

const MAX_SCALE: u32 = 10;

/// Input parameters for the export_sprite tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportSpriteInput {
    /// Project file to export.
    #[schemars(description = "Project file to export")]
    pub filename: String,

    /// Name of the output file.
    #[schemars(description = "Name of the output file")]
    pub output_filename: String,

    /// Output format: png, gif, jpg, jpeg, bmp, tga, or webp (default: png).
    #[serde(default = "default_sprite_format")]
    #[schemars(description = "Output format: png, gif, jpg, jpeg, bmp, tga, or webp (default: png)")]
    pub format: String,
}

fn default_sprite_format() -> String {
    "png".to_string()
}

/// Input parameters for the export_animation tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportAnimationInput {
    /// Project file to export.
    #[schemars(description = "Project file to export")]
    pub filename: String,

    /// Name of the output file.
    #[schemars(description = "Name of the output file")]
    pub output_filename: String,

    /// Output format: gif or webp (default: gif).
    #[serde(default = "default_animation_format")]
    #[schemars(description = "Output format: gif or webp (default: gif)")]
    pub format: String,

    /// Integer scale factor for the output (1-10, default: 1).
    #[serde(default = "default_scale")]
    #[schemars(description = "Integer scale factor for the output (1-10, default: 1)")]
    pub scale: u32,
}

fn default_animation_format() -> String {
    "gif".to_string()
}

fn default_scale() -> u32 {
    1
}

/// Input parameters for the export_spritesheet tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportSpritesheetInput {
    /// Project file to export.
    #[schemars(description = "Project file to export")]
    pub filename: String,

    /// Name of the output file.
    #[schemars(description = "Name of the output file")]
    pub output_filename: String,

    /// Output format: png, jpg, jpeg, bmp, or tga (default: png).
    #[serde(default = "default_sprite_format")]
    #[schemars(description = "Output format: png, jpg, jpeg, bmp, or tga (default: png)")]
    pub format: String,

    /// Sheet layout: horizontal, vertical, rows, columns, or packed.
    #[serde(default = "default_sheet_type")]
    #[schemars(description = "Sheet layout: horizontal, vertical, rows, columns, or packed")]
    pub sheet_type: String,
}

fn default_sheet_type() -> String {
    "horizontal".to_string()
}

/// Force `output` to carry the `.{format}` extension, replacing whatever
/// extension it came with.
fn coerce_output_extension(output: &str, format: &str) -> String {
    let path = Path::new(output);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(format) => output.to_string(),
        _ => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(output);
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    parent.join(format!("{stem}.{format}")).display().to_string()
                }
                _ => format!("{stem}.{format}"),
            }
        }
    }
}

fn normalize_format(format: &str, accepted: &[&str]) -> Result<String, ToolError> {
    let format = format.trim().to_ascii_lowercase();
    if accepted.contains(&format.as_str()) {
        Ok(format)
    } else {
        Err(ToolError::invalid(format!(
            "unsupported format '{format}'. Supported formats: {}",
            accepted.join(", ")
        )))
    }
}

pub async fn run_export_sprite(
    executor: &Executor,
    input: ExportSpriteInput,
) -> Result<String, ToolError> {
    let accepted: Vec<&str> = SPRITE_FORMATS.iter().map(|(f, _)| *f).collect();
    let format = normalize_format(&input.format, &accepted)?;
    let path = require_file(&input.filename)?;

    let output = coerce_output_extension(&input.output_filename, &format);
    let args = vec![
        "--batch".to_string(),
        path.display().to_string(),
        "--save-as".to_string(),
        output.clone(),
    ];
    executor.run_aseprite(args).await?;

    let label = SPRITE_FORMATS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, label)| *label)
        .unwrap_or("image");
    info!(from = %input.filename, to = %output, format = %format, "sprite exported");
    Ok(format!(
        "Sprite exported successfully from {} to {output} ({label})",
        input.filename
    ))
}

pub async fn run_export_animation(
    executor: &Executor,
    input: ExportAnimationInput,
) -> Result<String, ToolError> {
    let format = normalize_format(&input.format, ANIMATION_FORMATS)
        .map_err(|_| ToolError::invalid("animation export only supports 'gif' and 'webp'"))?;
    if input.scale == 0 || input.scale > MAX_SCALE {
        return Err(ToolError::invalid(format!("scale must be between 1 and {MAX_SCALE}")));
    }
    let path = require_file(&input.filename)?;

    let output = coerce_output_extension(&input.output_filename, &format);
    let mut args = vec!["--batch".to_string(), path.display().to_string()];
    if input.scale > 1 {
        args.push("--scale".to_string());
        args.push(input.scale.to_string());
    }
    args.push("--save-as".to_string());
    args.push(output.clone());
    executor.run_aseprite(args).await?;

    info!(from = %input.filename, to = %output, scale = input.scale, "animation exported");
    Ok(format!(
        "Animation exported successfully from {} to {output} (scale: {}x)",
        input.filename, input.scale
    ))
}

pub async fn run_export_spritesheet(
    executor: &Executor,
    input: ExportSpritesheetInput,
) -> Result<String, ToolError> {
    let format = normalize_format(&input.format, SHEET_FORMATS)?;
    if !SHEET_TYPES.contains(&input.sheet_type.as_str()) {
        return Err(ToolError::invalid(format!(
            "invalid sheet type '{}'. Valid types: {}",
            input.sheet_type,
            SHEET_TYPES.join(", ")
        )));
    }
    let path = require_file(&input.filename)?;

    let output = coerce_output_extension(&input.output_filename, &format);
    let args = vec![
        "--batch".to_string(),
        path.display().to_string(),
        "--sheet-type".to_string(),
        input.sheet_type.clone(),
        "--save-as".to_string(),
        output.clone(),
    ];
    executor.run_aseprite(args).await?;

    info!(from = %input.filename, to = %output, layout = %input.sheet_type, "spritesheet exported");
    Ok(format!(
        "Sprite sheet exported successfully from {} to {output} ({} layout)",
        input.filename, input.sheet_type
    ))
}
