//! Overlay placement and output canvas definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default portrait canvas width.
pub const PORTRAIT_WIDTH: u32 = 1080;
/// Default portrait canvas height.
pub const PORTRAIT_HEIGHT: u32 = 1920;
/// Default canvas background (near-black).
pub const DEFAULT_CANVAS_BACKGROUND: &str = "0x0A0A0A";

/// Where an overlay's top-left corner lands on the base frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Centered on both axes
    #[default]
    Center,
    /// Absolute pixel offset from the top-left corner
    At { x: i32, y: i32 },
}

/// Time window, position and opacity of an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayPlacement {
    #[serde(default)]
    pub position: Position,

    /// Seconds into the composition at which the overlay appears
    #[serde(default)]
    pub start_time: f64,

    /// Visible duration; `None` keeps it until the end of the composition
    #[serde(default)]
    pub duration: Option<f64>,

    /// Opacity (0.0 to 1.0)
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self {
            position: Position::Center,
            start_time: 0.0,
            duration: None,
            opacity: 1.0,
        }
    }
}

impl OverlayPlacement {
    /// Place at an absolute offset.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::At { x, y };
        self
    }

    /// Set the time window.
    pub fn with_window(mut self, start_time: f64, duration: Option<f64>) -> Self {
        self.start_time = start_time;
        self.duration = duration;
        self
    }

    /// Set opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Fixed-size output canvas the base clip is fitted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasSpec {
    #[serde(default = "default_canvas_width")]
    pub width: u32,

    #[serde(default = "default_canvas_height")]
    pub height: u32,

    /// Background color in any form FFmpeg accepts (`0xRRGGBB`, `black`)
    #[serde(default = "default_canvas_background")]
    pub background: String,
}

fn default_canvas_width() -> u32 {
    PORTRAIT_WIDTH
}
fn default_canvas_height() -> u32 {
    PORTRAIT_HEIGHT
}
fn default_canvas_background() -> String {
    DEFAULT_CANVAS_BACKGROUND.to_string()
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self::portrait()
    }
}

impl CanvasSpec {
    /// Standard 9:16 portrait canvas (1080x1920).
    pub fn portrait() -> Self {
        Self {
            width: PORTRAIT_WIDTH,
            height: PORTRAIT_HEIGHT,
            background: DEFAULT_CANVAS_BACKGROUND.to_string(),
        }
    }
}
