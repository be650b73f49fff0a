//! Drawing tools — pixels, lines, rectangles, circles, and flood fill.
//!
//! Every numeric range and color string is validated here, before any
//! script text exists; a bad argument never reaches a process spawn.

use schemars::JsonSchema;
use serde::Deserialize;

use super::require_file;
use crate::color::{parse_hex_color, Rgba};
use crate::error::ToolError;
use crate::exec::Executor;
use crate::lua::{self, PixelOp};

const MAX_THICKNESS: u32 = 100;

fn default_color() -> String {
    "#000000".to_string()
}

/// One pixel placement for the draw_pixels tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PixelSpec {
    /// X coordinate (non-negative).
    pub x: u32,
    /// Y coordinate (non-negative).
    pub y: u32,
    /// Hex color, e.g. "#FF0000".
    pub color: String,
}

/// Input parameters for the draw_pixels tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DrawPixelsInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,

    /// Pixels to place, each with x, y, and a hex color.
    #[schemars(description = "Pixels to place, each with x, y, and a hex color")]
    pub pixels: Vec<PixelSpec>,
}

/// Input parameters for the draw_line tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DrawLineInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    /// Hex color (default: "#000000").
    #[serde(default = "default_color")]
    #[schemars(description = "Hex color (default: #000000)")]
    pub color: String,
    /// Line thickness in pixels (1-100, default: 1).
    #[serde(default = "default_thickness")]
    #[schemars(description = "Line thickness in pixels (1-100, default: 1)")]
    pub thickness: u32,
}

fn default_thickness() -> u32 {
    1
}

/// Input parameters for the draw_rectangle tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DrawRectangleInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,
    /// Top-left x coordinate.
    pub x: i64,
    /// Top-left y coordinate.
    pub y: i64,
    /// Rectangle width in pixels (positive).
    pub width: u32,
    /// Rectangle height in pixels (positive).
    pub height: u32,
    /// Hex color (default: "#000000").
    #[serde(default = "default_color")]
    pub color: String,
    /// Fill the rectangle instead of outlining it.
    #[serde(default)]
    pub fill: bool,
}

/// Input parameters for the draw_circle tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DrawCircleInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,
    pub center_x: i64,
    pub center_y: i64,
    /// Radius in pixels (positive).
    pub radius: u32,
    /// Hex color (default: "#000000").
    #[serde(default = "default_color")]
    pub color: String,
    /// Fill the circle instead of outlining it.
    #[serde(default)]
    pub fill: bool,
}

/// Input parameters for the fill_area tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillAreaInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,
    pub x: i64,
    pub y: i64,
    /// Hex color (default: "#000000").
    #[serde(default = "default_color")]
    pub color: String,
}

fn parse_color_arg(color: &str) -> Result<Rgba, ToolError> {
    parse_hex_color(color)
        .map_err(|e| ToolError::invalid(format!("invalid color '{color}': {e}")))
}

pub async fn run_draw_pixels(
    executor: &Executor,
    input: DrawPixelsInput,
) -> Result<String, ToolError> {
    if input.pixels.is_empty() {
        return Err(ToolError::invalid("no pixels provided"));
    }
    let path = require_file(&input.filename)?;

    let mut ops = Vec::with_capacity(input.pixels.len());
    for (i, p) in input.pixels.iter().enumerate() {
        let color = parse_hex_color(&p.color)
            .map_err(|e| ToolError::invalid(format!("pixel {i}: invalid color '{}': {e}", p.color)))?;
        ops.push(PixelOp { x: p.x, y: p.y, color });
    }

    let script = lua::draw_pixels(&ops);
    executor.run_script(&script, Some(&path)).await?;

    Ok(format!("Successfully drew {} pixels in {}", ops.len(), input.filename))
}

pub async fn run_draw_line(executor: &Executor, input: DrawLineInput) -> Result<String, ToolError> {
    if input.thickness == 0 || input.thickness > MAX_THICKNESS {
        return Err(ToolError::invalid(format!(
            "thickness must be between 1 and {MAX_THICKNESS}"
        )));
    }
    let color = parse_color_arg(&input.color)?;
    let path = require_file(&input.filename)?;

    let script = lua::draw_line(input.x1, input.y1, input.x2, input.y2, color, input.thickness);
    executor.run_script(&script, Some(&path)).await?;

    Ok(format!(
        "Line drawn successfully from ({},{}) to ({},{}) in {}",
        input.x1, input.y1, input.x2, input.y2, input.filename
    ))
}

pub async fn run_draw_rectangle(
    executor: &Executor,
    input: DrawRectangleInput,
) -> Result<String, ToolError> {
    if input.width == 0 || input.height == 0 {
        return Err(ToolError::invalid("width and height must be positive"));
    }
    let color = parse_color_arg(&input.color)?;
    let path = require_file(&input.filename)?;

    let script =
        lua::draw_rectangle(input.x, input.y, input.width, input.height, color, input.fill);
    executor.run_script(&script, Some(&path)).await?;

    let kind = if input.fill { "Filled rectangle" } else { "Rectangle" };
    Ok(format!(
        "{kind} drawn successfully at ({},{}) size {}x{} in {}",
        input.x, input.y, input.width, input.height, input.filename
    ))
}

pub async fn run_draw_circle(
    executor: &Executor,
    input: DrawCircleInput,
) -> Result<String, ToolError> {
    if input.radius == 0 {
        return Err(ToolError::invalid("radius must be positive"));
    }
    let color = parse_color_arg(&input.color)?;
    let path = require_file(&input.filename)?;

    let script =
        lua::draw_circle(input.center_x, input.center_y, input.radius, color, input.fill);
    executor.run_script(&script, Some(&path)).await?;

    let kind = if input.fill { "Filled circle" } else { "Circle" };
    Ok(format!(
        "{kind} drawn successfully at ({},{}) radius {} in {}",
        input.center_x, input.center_y, input.radius, input.filename
    ))
}

pub async fn run_fill_area(executor: &Executor, input: FillAreaInput) -> Result<String, ToolError> {
    let color = parse_color_arg(&input.color)?;
    let path = require_file(&input.filename)?;

    let script = lua::fill_area(input.x, input.y, color);
    executor.run_script(&script, Some(&path)).await?;

    Ok(format!("Area filled successfully at ({},{}) in {}", input.x, input.y, input.filename))
}
