//! Render job manifest.
//!
//! A render job describes one source video and the ordered edits applied to
//! it. Jobs are independent of each other and can be rendered concurrently.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::overlay::{CanvasSpec, OverlayPlacement};
use crate::text::TextOverlaySpec;

/// One composition to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Optional caller-supplied identifier; generated when absent
    #[serde(default)]
    pub id: Option<String>,

    /// Local path or remote video URL
    pub source: String,

    /// Output file name (relative to the processed directory) or absolute path
    pub output: String,

    /// Source window to keep before any other edit
    #[serde(default)]
    pub trim: Option<TrimWindow>,

    /// Playback speed factor (> 0)
    #[serde(default)]
    pub speed: Option<f64>,

    #[serde(default)]
    pub audio: Option<AudioRequest>,

    /// Effect tokens, e.g. `["brightness-1.5", "mirror_x"]`
    #[serde(default)]
    pub effects: Vec<String>,

    #[serde(default)]
    pub canvas: Option<CanvasSpec>,

    #[serde(default)]
    pub text: Option<TextOverlaySpec>,

    /// Overlays in stacking order (later entries render on top)
    #[serde(default)]
    pub overlays: Vec<OverlayRequest>,

    /// Hand the finished file to the publisher
    #[serde(default)]
    pub publish: Option<PublishSpec>,
}

impl RenderJob {
    /// Create a job with no edits.
    pub fn new(source: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            output: output.into(),
            trim: None,
            speed: None,
            audio: None,
            effects: Vec::new(),
            canvas: None,
            text: None,
            overlays: Vec::new(),
            publish: None,
        }
    }
}

/// Source window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

/// Which audio file to bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioChoice {
    /// A file name in the music directory, or an absolute path
    File(String),
    /// Any file from the music directory
    Random,
}

/// Background audio request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioRequest {
    pub source: AudioChoice,

    /// Linear gain (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Seconds to skip at the start of the audio file
    #[serde(default)]
    pub start_offset: f64,
}

fn default_volume() -> f64 {
    1.0
}

/// Image or video overlay request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayRequest {
    pub path: String,

    #[serde(flatten)]
    pub placement: OverlayPlacement,
}

/// Post visibility on the publishing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Viewer interactions allowed on a published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InteractionFlags {
    #[serde(default = "default_true")]
    pub comments: bool,
    #[serde(default)]
    pub duet: bool,
    #[serde(default)]
    pub stitch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InteractionFlags {
    fn default() -> Self {
        Self {
            comments: true,
            duet: false,
            stitch: false,
        }
    }
}

/// Publish request attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublishSpec {
    /// Identity (session name) to publish as
    pub identity: String,
    pub title: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub interactions: InteractionFlags,
}
