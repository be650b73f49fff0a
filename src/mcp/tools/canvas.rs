//! Canvas tools — create project files and manage their layers/frames.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::require_file;
use crate::error::ToolError;
use crate::exec::Executor;
use crate::lua;

/// Largest canvas edge Aseprite will accept from us.
const MAX_CANVAS_EDGE: u32 = 8192;

/// Input parameters for the create_canvas tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCanvasInput {
    /// Width of the canvas in pixels (1-8192).
    #[schemars(description = "Width of the canvas in pixels (1-8192)")]
    pub width: u32,

    /// Height of the canvas in pixels (1-8192).
    #[schemars(description = "Height of the canvas in pixels (1-8192)")]
    pub height: u32,

    /// Name of the project file to create (default: canvas.aseprite).
    #[schemars(description = "Name of the project file to create (default: canvas.aseprite)")]
    pub filename: Option<String>,
}

/// Input parameters for the add_layer tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddLayerInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,

    /// Name of the new layer.
    #[schemars(description = "Name of the new layer")]
    pub layer_name: String,
}

/// Input parameters for the add_frame tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddFrameInput {
    /// Project file to modify.
    #[schemars(description = "Project file to modify")]
    pub filename: String,
}

/// Input parameters for the get_canvas_info tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CanvasInfoInput {
    /// Project file to inspect.
    #[schemars(description = "Project file to inspect")]
    pub filename: String,
}

/// Coerce a project filename to an Aseprite-native extension.
fn coerce_project_extension(filename: &str) -> String {
    let path = std::path::Path::new(filename);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("aseprite") || ext.eq_ignore_ascii_case("ase") => {
            filename.to_string()
        }
        _ => format!("{}.aseprite", path.file_stem().and_then(|s| s.to_str()).unwrap_or("canvas")),
    }
}

pub async fn run_create_canvas(
    executor: &Executor,
    input: CreateCanvasInput,
) -> Result<String, ToolError> {
    if input.width == 0 || input.height == 0 {
        return Err(ToolError::invalid("width and height must be positive"));
    }
    if input.width > MAX_CANVAS_EDGE || input.height > MAX_CANVAS_EDGE {
        return Err(ToolError::invalid(format!(
            "canvas dimensions too large (max {MAX_CANVAS_EDGE}x{MAX_CANVAS_EDGE})"
        )));
    }

    let filename = coerce_project_extension(
        input.filename.as_deref().unwrap_or("canvas.aseprite"),
    );

    let script = lua::create_canvas(input.width, input.height, &filename);
    executor.run_script(&script, None).await?;

    info!(filename = %filename, width = input.width, height = input.height, "canvas created");
    Ok(format!(
        "Canvas created successfully: {filename} ({}x{})",
        input.width, input.height
    ))
}

pub async fn run_add_layer(executor: &Executor, input: AddLayerInput) -> Result<String, ToolError> {
    if input.layer_name.trim().is_empty() {
        return Err(ToolError::invalid("layer name cannot be empty"));
    }
    let path = require_file(&input.filename)?;

    let script = lua::add_layer(&input.layer_name);
    executor.run_script(&script, Some(&path)).await?;

    Ok(format!(
        "Layer '{}' added successfully to {}",
        input.layer_name, input.filename
    ))
}

pub async fn run_add_frame(executor: &Executor, input: AddFrameInput) -> Result<String, ToolError> {
    let path = require_file(&input.filename)?;

    let script = lua::add_frame();
    executor.run_script(&script, Some(&path)).await?;

    Ok(format!("New frame added successfully to {}", input.filename))
}

pub async fn run_canvas_info(
    executor: &Executor,
    input: CanvasInfoInput,
) -> Result<String, ToolError> {
    let path = require_file(&input.filename)?;

    let script = lua::canvas_info();
    let result = executor.run_script(&script, Some(&path)).await?;

    let info = result.stdout.trim();
    if info.is_empty() {
        Ok(format!("No canvas information reported for {}", input.filename))
    } else {
        Ok(info.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_executor() -> Executor {
        // /bin/true exits 0 and ignores its arguments, which is all the
        // validation-focused tests need.
        Executor::new(PathBuf::from("/bin/true"), Duration::from_secs(5), 0)
    }

    #[test]
    fn coerces_extension() {
        assert_eq!(coerce_project_extension("sprite.png"), "sprite.aseprite");
        assert_eq!(coerce_project_extension("sprite"), "sprite.aseprite");
        assert_eq!(coerce_project_extension("sprite.aseprite"), "sprite.aseprite");
        assert_eq!(coerce_project_extension("sprite.ASE"), "sprite.ASE");
    }

    #[tokio::test]
    async fn create_canvas_rejects_zero_dimensions() {
        let input = CreateCanvasInput { width: 0, height: 10, filename: None };
        let err = run_create_canvas(&test_executor(), input).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_canvas_rejects_oversized_dimensions() {
        let input = CreateCanvasInput { width: 9000, height: 10, filename: None };
        let err = run_create_canvas(&test_executor(), input).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_canvas_runs_against_stub_binary() {
        let input = CreateCanvasInput { width: 16, height: 16, filename: Some("x.png".into()) };
        let msg = run_create_canvas(&test_executor(), input).await.unwrap();
        assert!(msg.contains("x.aseprite"));
        assert!(msg.contains("16x16"));
    }

    #[tokio::test]
    async fn add_layer_rejects_blank_name() {
        let input = AddLayerInput { filename: "whatever.aseprite".into(), layer_name: "  ".into() };
        let err = run_add_layer(&test_executor(), input).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn add_frame_requires_existing_file() {
        let input = AddFrameInput { filename: "/no/such/file.aseprite".into() };
        let err = run_add_frame(&test_executor(), input).await.unwrap_err();
        assert!(matches!(err, ToolError::SourceNotFound(_)));
    }
}
