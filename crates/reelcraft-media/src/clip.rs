//! Clip values.
//!
//! A [`MediaClip`] is an immutable description of a media source plus the
//! transforms applied to it so far. Transforms return a new clip; the
//! superseded value is simply dropped. The underlying file is shared through
//! an `Arc<ClipSource>`, so a temporary file owned by the pipeline is
//! deleted once the last clip referring to it goes away.

use reelcraft_models::{CanvasSpec, EffectSpec};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

use crate::backend::MediaBackend;
use crate::error::{MediaError, MediaResult};
use crate::probe::MediaInfo;

/// Extensions opened as still images rather than video.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Where a clip's bytes live.
#[derive(Debug)]
pub enum ClipSource {
    /// A file the caller owns; never deleted by the pipeline
    Borrowed(PathBuf),
    /// A temporary file removed when the last handle drops
    Owned(TempPath),
}

impl ClipSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Borrowed(path) => path.as_path(),
            Self::Owned(temp) => &**temp,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    Video,
    Image,
}

/// A visual transform baked into a clip, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualOp {
    Effect(EffectSpec),
    Canvas(CanvasSpec),
}

/// A decoded media source with its timeline and geometry.
#[derive(Debug, Clone)]
pub struct MediaClip {
    source: Arc<ClipSource>,
    kind: ClipKind,
    /// Probed duration of the whole source file
    source_duration: f64,
    /// Window into the source, in source seconds
    window: (f64, f64),
    speed: f64,
    frame_size: (u32, u32),
    frame_rate: f64,
    has_audio: bool,
    visuals: Vec<VisualOp>,
}

impl MediaClip {
    /// Open a caller-owned file.
    pub async fn open(backend: &dyn MediaBackend, path: impl AsRef<Path>) -> MediaResult<Self> {
        let source = ClipSource::Borrowed(path.as_ref().to_path_buf());
        Self::from_source(backend, Arc::new(source)).await
    }

    /// Open a temporary file whose lifetime the clip takes over.
    pub async fn open_owned(backend: &dyn MediaBackend, temp: TempPath) -> MediaResult<Self> {
        Self::from_source(backend, Arc::new(ClipSource::Owned(temp))).await
    }

    async fn from_source(backend: &dyn MediaBackend, source: Arc<ClipSource>) -> MediaResult<Self> {
        let path = source.path().to_path_buf();
        let info = probe_for_decode(backend, &path).await?;

        if !info.has_video() || info.width == 0 || info.height == 0 {
            return Err(MediaError::decode(&path, "no video stream"));
        }

        let kind = if is_image_path(&path) {
            ClipKind::Image
        } else {
            ClipKind::Video
        };

        if kind == ClipKind::Video && info.duration <= 0.0 {
            return Err(MediaError::decode(&path, "video has no duration"));
        }

        let source_duration = match kind {
            ClipKind::Video => info.duration,
            ClipKind::Image => 0.0,
        };

        Ok(Self {
            source,
            kind,
            source_duration,
            window: (0.0, source_duration),
            speed: 1.0,
            frame_size: (info.width, info.height),
            frame_rate: info.fps,
            has_audio: kind == ClipKind::Video && info.has_audio(),
            visuals: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub(crate) fn source(&self) -> &Arc<ClipSource> {
        &self.source
    }

    pub fn kind(&self) -> ClipKind {
        self.kind
    }

    pub fn is_image(&self) -> bool {
        self.kind == ClipKind::Image
    }

    /// Playback duration after trim and speed (0 for still images).
    pub fn duration(&self) -> f64 {
        (self.window.1 - self.window.0) / self.speed
    }

    /// Duration of the whole source file.
    pub fn source_duration(&self) -> f64 {
        self.source_duration
    }

    /// Source window `(start, end)` in source seconds.
    pub fn window(&self) -> (f64, f64) {
        self.window
    }

    /// Whether the window excludes part of the source.
    pub fn is_trimmed(&self) -> bool {
        self.window.0 > 0.0 || self.window.1 < self.source_duration
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Output frame size `(width, height)` after every visual transform.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn visuals(&self) -> &[VisualOp] {
        &self.visuals
    }

    /// Keep only `[start, end)` of the current timeline.
    ///
    /// `end` past the clip duration is clamped to the duration.
    pub fn trimmed(&self, start: f64, end: f64) -> MediaResult<Self> {
        if self.is_image() {
            return Err(MediaError::invalid_parameter("cannot trim a still image"));
        }
        if !start.is_finite() || start < 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "trim start must be >= 0, got {start}"
            )));
        }

        let end = end.min(self.duration());
        if start >= end {
            return Err(MediaError::invalid_parameter(format!(
                "trim start {start} must be before end {end}"
            )));
        }

        let origin = self.window.0;
        Ok(Self {
            window: (origin + start * self.speed, origin + end * self.speed),
            ..self.clone()
        })
    }

    /// Retime by `factor`; the duration becomes `duration / factor`.
    pub fn with_speed(&self, factor: f64) -> MediaResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "speed factor must be > 0, got {factor}"
            )));
        }
        if self.is_image() {
            return Err(MediaError::invalid_parameter("cannot retime a still image"));
        }

        Ok(Self {
            speed: self.speed * factor,
            ..self.clone()
        })
    }

    /// Append `effects` in order.
    pub fn with_effects(&self, effects: &[EffectSpec]) -> MediaResult<Self> {
        for effect in effects {
            effect
                .validate()
                .map_err(|e| MediaError::invalid_parameter(e.to_string()))?;
        }

        let mut visuals = self.visuals.clone();
        visuals.extend(effects.iter().cloned().map(VisualOp::Effect));
        Ok(Self {
            visuals,
            ..self.clone()
        })
    }

    /// Letterbox into `canvas`, preserving aspect ratio.
    pub fn fitted(&self, canvas: &CanvasSpec) -> MediaResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(MediaError::invalid_parameter(format!(
                "canvas must be non-empty, got {}x{}",
                canvas.width, canvas.height
            )));
        }

        let mut visuals = self.visuals.clone();
        visuals.push(VisualOp::Canvas(canvas.clone()));
        Ok(Self {
            visuals,
            frame_size: (canvas.width, canvas.height),
            ..self.clone()
        })
    }
}

/// A decoded audio source.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    source: Arc<ClipSource>,
    source_duration: f64,
    offset: f64,
    volume: f64,
}

impl AudioTrack {
    /// Open a caller-owned audio file.
    pub async fn open(backend: &dyn MediaBackend, path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe_for_decode(backend, &path).await?;

        if !info.has_audio() {
            return Err(MediaError::decode(&path, "no audio stream"));
        }
        if info.duration <= 0.0 {
            return Err(MediaError::decode(&path, "audio has no duration"));
        }

        Ok(Self {
            source: Arc::new(ClipSource::Borrowed(path)),
            source_duration: info.duration,
            offset: 0.0,
            volume: 1.0,
        })
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub(crate) fn source(&self) -> &Arc<ClipSource> {
        &self.source
    }

    /// Playable duration after the start offset.
    pub fn duration(&self) -> f64 {
        self.source_duration - self.offset
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Start playback `seconds` into the file.
    pub fn with_offset(&self, seconds: f64) -> MediaResult<Self> {
        if !seconds.is_finite() || seconds < 0.0 || seconds >= self.source_duration {
            return Err(MediaError::invalid_parameter(format!(
                "audio offset {seconds} outside [0, {})",
                self.source_duration
            )));
        }
        Ok(Self {
            offset: seconds,
            ..self.clone()
        })
    }

    /// Linear gain in `[0, 1]`.
    pub fn with_volume(&self, volume: f64) -> MediaResult<Self> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(MediaError::invalid_parameter(format!(
                "volume must be within [0, 1], got {volume}"
            )));
        }
        Ok(Self {
            volume,
            ..self.clone()
        })
    }
}

/// Whether `path` names a still image by extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn probe_for_decode(backend: &dyn MediaBackend, path: &Path) -> MediaResult<MediaInfo> {
    backend.probe(path).await.map_err(|e| match e {
        MediaError::FfprobeFailed { .. } | MediaError::JsonParse(_) => {
            MediaError::decode(path, e.to_string())
        }
        other => other,
    })
}
