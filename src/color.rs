//! Hex color parsing for drawing tool arguments.
//!
//! Accepts `#RRGGBB` and `#RRGGBBAA` (the leading `#` is optional on
//! input); parsed values are normalized back to an uppercase `#`-prefixed
//! form before they are embedded in a Lua script.

use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 6 or 8 hex chars after the optional #)
    #[error("invalid color length {0}, expected 6 or 8 hex digits")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// An RGBA color parsed from a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Normalized uppercase hex form, alpha included only when not opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Parse a hex color string into an RGBA color.
///
/// # Examples
///
/// ```
/// use aseprite_mcp::color::parse_hex_color;
///
/// let red = parse_hex_color("#FF0000").unwrap();
/// assert_eq!((red.r, red.g, red.b, red.a), (255, 0, 0, 255));
///
/// let translucent = parse_hex_color("00ff0080").unwrap();
/// assert_eq!(translucent.a, 128);
/// ```
pub fn parse_hex_color(input: &str) -> Result<Rgba, ColorError> {
    let hex = input.trim().trim_start_matches('#');
    if hex.is_empty() {
        return Err(ColorError::Empty);
    }
    if hex.len() != 6 && hex.len() != 8 {
        return Err(ColorError::InvalidLength(hex.len()));
    }
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(bad));
    }

    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    let a = if hex.len() == 8 { byte(6) } else { 255 };

    Ok(Rgba { r: byte(0), g: byte(2), b: byte(4), a })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex() {
        let c = parse_hex_color("#1A2B3C").unwrap();
        assert_eq!(c, Rgba { r: 0x1A, g: 0x2B, b: 0x3C, a: 255 });
    }

    #[test]
    fn parses_without_hash() {
        assert_eq!(parse_hex_color("ffffff").unwrap().r, 255);
    }

    #[test]
    fn parses_alpha_channel() {
        let c = parse_hex_color("#00000080").unwrap();
        assert_eq!(c.a, 0x80);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(parse_hex_color(""), Err(ColorError::Empty));
        assert_eq!(parse_hex_color("#"), Err(ColorError::Empty));
    }

    #[test]
    fn rejects_bad_length() {
        assert_eq!(parse_hex_color("#FFF"), Err(ColorError::InvalidLength(3)));
        assert_eq!(parse_hex_color("#FF00FF0"), Err(ColorError::InvalidLength(7)));
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(parse_hex_color("#GG0000"), Err(ColorError::InvalidHex('G')));
    }

    #[test]
    fn normalizes_to_uppercase() {
        assert_eq!(parse_hex_color("#ff00aa").unwrap().to_hex(), "#FF00AA");
        assert_eq!(parse_hex_color("#ff00aa80").unwrap().to_hex(), "#FF00AA80");
    }
}
