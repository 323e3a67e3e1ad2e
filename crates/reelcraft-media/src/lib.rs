//! FFmpeg-backed media pipeline.
//!
//! This crate provides:
//! - Source resolution for local files and remote video URLs, including
//!   stream selection and adaptive stream muxing
//! - An immutable-value composition engine (speed, audio, effects,
//!   canvas, overlays, captions)
//! - Atomic export to MP4 through a pluggable [`MediaBackend`]
//! - Type-safe FFmpeg command building with progress parsing and
//!   cancellation

pub mod backend;
pub mod clip;
pub mod command;
pub mod compose;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod source;
pub mod wait;

pub use backend::{FfmpegBackend, MediaBackend};
pub use clip::{AudioTrack, ClipKind, ClipSource, MediaClip, VisualOp};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use compose::{
    parse_effects, AudioFit, BoundAudio, CaptionLayout, Composition, ExportOptions, ExportReport,
    Exporter, OverlayLayer, RenderPlan, Stage,
};
pub use error::{ErrorKind, MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use source::{
    is_remote_ref, ResolverConfig, SelectionRules, SelectorConfig, SourceResolver, StreamCatalog,
    StreamChoice, StreamKind, StreamSelector, StreamSource, StreamVariant, YtDlp,
};
pub use wait::{wait_until_exists, WaitError, WaitPolicy};
