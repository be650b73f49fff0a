//! Lua script assembly for Aseprite batch mode.
//!
//! Aseprite is driven almost entirely through generated Lua run with
//! `--batch [file] --script tmp.lua`. Every value interpolated here has
//! already passed its field validator; strings additionally go through
//! [`escape`] so no caller input can break out of a Lua string literal.

use crate::color::Rgba;

/// A pixel placement for [`draw_pixels`].
#[derive(Debug, Clone, Copy)]
pub struct PixelOp {
    pub x: u32,
    pub y: u32,
    pub color: Rgba,
}

/// Escape a string for embedding in a double-quoted Lua literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Lua prologue that grabs the active sprite and ensures a cel exists,
/// wrapped in a named transaction. Paired with [`transaction_close`].
fn transaction_open(name: &str) -> String {
    format!(
        r#"local spr = app.activeSprite
if not spr then
    return "Error: No active sprite"
end

app.transaction("{name}", function()
    local cel = app.activeCel
    if not cel then
        app.activeLayer = spr.layers[1]
        app.activeFrame = spr.frames[1]
        cel = spr:newCel(app.activeLayer, app.activeFrame)
        if not cel then
            return "Error: Could not create cel"
        end
    end
"#
    )
}

fn transaction_close(message: &str) -> String {
    format!(
        r#"end)

spr:saveAs(spr.filename)
return "{message}"
"#
    )
}

fn lua_color(c: Rgba) -> String {
    format!("Color({}, {}, {}, {})", c.r, c.g, c.b, c.a)
}

/// Script that creates a new sprite and saves it under `filename`.
pub fn create_canvas(width: u32, height: u32, filename: &str) -> String {
    let filename = escape(filename);
    format!(
        r#"local spr = Sprite({width}, {height})
if spr then
    spr:saveAs("{filename}")
    return "Canvas created successfully: {filename}"
else
    return "Failed to create sprite"
end
"#
    )
}

/// Script that appends a named layer to the open sprite.
pub fn add_layer(layer_name: &str) -> String {
    let name = escape(layer_name);
    format!(
        r#"local spr = app.activeSprite
if not spr then
    return "Error: No active sprite"
end

app.transaction("Add Layer", function()
    local new_layer = spr:newLayer()
    if new_layer then
        new_layer.name = "{name}"
    else
        return "Error: Failed to create layer"
    end
end)

spr:saveAs(spr.filename)
return "Layer added successfully"
"#
    )
}

/// Script that appends a frame to the open sprite.
pub fn add_frame() -> String {
    r#"local spr = app.activeSprite
if not spr then
    return "Error: No active sprite"
end

app.transaction("Add Frame", function()
    local new_frame = spr:newFrame()
    if not new_frame then
        return "Error: Failed to create frame"
    end
end)

spr:saveAs(spr.filename)
return "Frame added successfully"
"#
    .to_string()
}

/// Script that prints the open sprite's dimensions, layer count, frame
/// count and color mode.
pub fn canvas_info() -> String {
    r#"local spr = app.activeSprite
if not spr then
    return "Error: No active sprite"
end

print("Canvas: " .. spr.width .. "x" .. spr.height ..
      ", Layers: " .. #spr.layers ..
      ", Frames: " .. #spr.frames ..
      ", Color Mode: " .. tostring(spr.colorMode))
"#
    .to_string()
}

/// Script that places individual pixels, skipping any outside the image.
pub fn draw_pixels(pixels: &[PixelOp]) -> String {
    let mut script = transaction_open("Draw Pixels");
    script.push_str("    local img = cel.image\n");
    for p in pixels {
        script.push_str(&format!(
            "    if {x} < img.width and {y} < img.height then\n        img:putPixel({x}, {y}, {color})\n    end\n",
            x = p.x,
            y = p.y,
            color = lua_color(p.color),
        ));
    }
    script.push_str(&transaction_close("Pixels drawn successfully"));
    script
}

/// Script that draws a line with the line tool and a sized brush.
pub fn draw_line(x1: i64, y1: i64, x2: i64, y2: i64, color: Rgba, thickness: u32) -> String {
    let mut script = transaction_open("Draw Line");
    script.push_str(&format!(
        r#"    local color = {color}
    local brush = Brush()
    brush.size = {thickness}

    app.useTool({{
        tool="line",
        color=color,
        brush=brush,
        points={{Point({x1}, {y1}), Point({x2}, {y2})}}
    }})
"#,
        color = lua_color(color),
    ));
    script.push_str(&transaction_close("Line drawn successfully"));
    script
}

/// Script that draws an outlined or filled rectangle.
pub fn draw_rectangle(x: i64, y: i64, width: u32, height: u32, color: Rgba, fill: bool) -> String {
    let tool = if fill { "filled_rectangle" } else { "rectangle" };
    let mut script = transaction_open("Draw Rectangle");
    script.push_str(&format!(
        r#"    local color = {color}
    app.useTool({{
        tool="{tool}",
        color=color,
        points={{Point({x}, {y}), Point({x2}, {y2})}}
    }})
"#,
        color = lua_color(color),
        x2 = x + i64::from(width),
        y2 = y + i64::from(height),
    ));
    script.push_str(&transaction_close("Rectangle drawn successfully"));
    script
}

/// Script that draws an outlined or filled circle, expressed as the
/// ellipse tool over the bounding box.
pub fn draw_circle(center_x: i64, center_y: i64, radius: u32, color: Rgba, fill: bool) -> String {
    let tool = if fill { "filled_ellipse" } else { "ellipse" };
    let r = i64::from(radius);
    let mut script = transaction_open("Draw Circle");
    script.push_str(&format!(
        r#"    local color = {color}
    app.useTool({{
        tool="{tool}",
        color=color,
        points={{
            Point({x1}, {y1}),
            Point({x2}, {y2})
        }}
    }})
"#,
        color = lua_color(color),
        x1 = center_x - r,
        y1 = center_y - r,
        x2 = center_x + r,
        y2 = center_y + r,
    ));
    script.push_str(&transaction_close("Circle drawn successfully"));
    script
}

/// Script that flood-fills from a point with the paint bucket tool.
pub fn fill_area(x: i64, y: i64, color: Rgba) -> String {
    let mut script = transaction_open("Fill Area");
    script.push_str(&format!(
        r#"    local color = {color}
    app.useTool({{
        tool="paint_bucket",
        color=color,
        points={{Point({x}, {y})}}
    }})
"#,
        color = lua_color(color),
    ));
    script.push_str(&transaction_close("Area filled successfully"));
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_hex_color;

    fn red() -> Rgba {
        parse_hex_color("#FF0000").unwrap()
    }

    #[test]
    fn escape_handles_quotes_and_backslashes() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape("line1\nline2"), "line1\\nline2");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn create_canvas_embeds_dimensions() {
        let script = create_canvas(64, 32, "sprite.aseprite");
        assert!(script.contains("Sprite(64, 32)"));
        assert!(script.contains(r#"saveAs("sprite.aseprite")"#));
    }

    #[test]
    fn create_canvas_escapes_filename() {
        let script = create_canvas(8, 8, r#"we"ird.aseprite"#);
        assert!(script.contains(r#"saveAs("we\"ird.aseprite")"#));
    }

    #[test]
    fn add_layer_escapes_name() {
        let script = add_layer(r#"back"ground"#);
        assert!(script.contains(r#"new_layer.name = "back\"ground""#));
    }

    #[test]
    fn draw_pixels_emits_bounds_guard_per_pixel() {
        let ops = [
            PixelOp { x: 0, y: 0, color: red() },
            PixelOp { x: 3, y: 5, color: red() },
        ];
        let script = draw_pixels(&ops);
        assert_eq!(script.matches("putPixel").count(), 2);
        assert!(script.contains("putPixel(3, 5, Color(255, 0, 0, 255))"));
        assert!(script.contains("if 3 < img.width and 5 < img.height"));
    }

    #[test]
    fn draw_line_sets_brush_size() {
        let script = draw_line(0, 0, 9, 9, red(), 3);
        assert!(script.contains("brush.size = 3"));
        assert!(script.contains("Point(0, 0), Point(9, 9)"));
        assert!(script.contains(r#"tool="line""#));
    }

    #[test]
    fn rectangle_uses_filled_tool_when_requested() {
        assert!(draw_rectangle(1, 2, 10, 20, red(), false).contains(r#"tool="rectangle""#));
        assert!(draw_rectangle(1, 2, 10, 20, red(), true).contains(r#"tool="filled_rectangle""#));
        // Corner points span x..x+width, y..y+height.
        assert!(draw_rectangle(1, 2, 10, 20, red(), true).contains("Point(1, 2), Point(11, 22)"));
    }

    #[test]
    fn circle_points_span_bounding_box() {
        let script = draw_circle(10, 10, 4, red(), false);
        assert!(script.contains("Point(6, 6)"));
        assert!(script.contains("Point(14, 14)"));
        assert!(script.contains(r#"tool="ellipse""#));
    }

    #[test]
    fn fill_area_uses_paint_bucket() {
        let script = fill_area(2, 3, red());
        assert!(script.contains(r#"tool="paint_bucket""#));
        assert!(script.contains("Point(2, 3)"));
    }
}
