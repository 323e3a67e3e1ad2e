//! Caption text overlay definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default caption font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 70;
/// Default caption stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: u32 = 2;
/// Default vertical anchor (fraction of frame height).
pub const DEFAULT_VERTICAL_POSITION: f64 = 0.2;

/// Caption-style text overlay.
///
/// Text is word-wrapped to `box_width`, horizontally centered, and its top
/// edge is anchored at `vertical_position * frame_height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextOverlaySpec {
    pub text: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Path to a font file; the FFmpeg default font is used when absent
    #[serde(default)]
    pub font_face: Option<String>,

    /// Wrap width in pixels; defaults to the frame width
    #[serde(default)]
    pub box_width: Option<u32>,

    #[serde(default = "default_vertical_position")]
    pub vertical_position: f64,
}

fn default_color() -> String {
    "white".to_string()
}
fn default_stroke_color() -> String {
    "black".to_string()
}
fn default_stroke_width() -> u32 {
    DEFAULT_STROKE_WIDTH
}
fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}
fn default_vertical_position() -> f64 {
    DEFAULT_VERTICAL_POSITION
}

impl TextOverlaySpec {
    /// Create a caption with default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: default_color(),
            stroke_color: default_stroke_color(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            font_face: None,
            box_width: None,
            vertical_position: DEFAULT_VERTICAL_POSITION,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_font_face(mut self, font_face: impl Into<String>) -> Self {
        self.font_face = Some(font_face.into());
        self
    }

    pub fn with_box_width(mut self, box_width: u32) -> Self {
        self.box_width = Some(box_width);
        self
    }

    pub fn with_vertical_position(mut self, fraction: f64) -> Self {
        self.vertical_position = fraction;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_defaults() {
        let spec: TextOverlaySpec = serde_json::from_str(r#"{"text": "Hello"}"#).unwrap();
        assert_eq!(spec, TextOverlaySpec::new("Hello"));
        assert_eq!(spec.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(spec.stroke_color, "black");
    }
}
