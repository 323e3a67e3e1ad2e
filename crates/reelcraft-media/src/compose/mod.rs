//! Composition engine.
//!
//! A [`Composition`] owns one base clip and moves through a fixed pipeline:
//!
//! ```text
//! Empty -> SpeedApplied -> AudioBound -> EffectsApplied -> Overlaid -> Exported
//! ```
//!
//! Every stage after `Empty` is optional, but stages never go backwards: an
//! operation belonging to an earlier stage than the current one fails with
//! [`MediaError::InvalidState`]. A failed operation leaves the composition
//! unchanged. `export` is terminal and releases every clip, track and
//! overlay the composition holds, whether the encode succeeds or not.

pub mod effects;
pub mod export;
pub mod overlay;
pub mod text;
pub mod timeline;

pub use effects::parse_effects;
pub use export::{ExportOptions, ExportReport, Exporter, RenderPlan};
pub use overlay::OverlayLayer;
pub use text::CaptionLayout;
pub use timeline::{AudioFit, BoundAudio};

use reelcraft_models::{CanvasSpec, EffectSpec, OverlayPlacement, TextOverlaySpec};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::MediaBackend;
use crate::clip::{AudioTrack, MediaClip};
use crate::error::{MediaError, MediaResult};

/// Pipeline position of a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Empty,
    SpeedApplied,
    AudioBound,
    EffectsApplied,
    Overlaid,
    Exported,
}

/// The aggregate timeline for one output file.
pub struct Composition {
    backend: Arc<dyn MediaBackend>,
    stage: Stage,
    base: Option<MediaClip>,
    audio: Option<BoundAudio>,
    caption: Option<CaptionLayout>,
    overlays: Vec<OverlayLayer>,
    options: ExportOptions,
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("stage", &self.stage)
            .field("base", &self.base)
            .field("audio", &self.audio)
            .field("caption", &self.caption)
            .field("overlays", &self.overlays.len())
            .finish_non_exhaustive()
    }
}

impl Composition {
    /// Start an empty composition from a video clip.
    pub fn new(backend: Arc<dyn MediaBackend>, base: MediaClip) -> MediaResult<Self> {
        if base.is_image() {
            return Err(MediaError::invalid_parameter(format!(
                "base clip must be a video: {}",
                base.path().display()
            )));
        }

        Ok(Self {
            backend,
            stage: Stage::Empty,
            base: Some(base),
            audio: None,
            caption: None,
            overlays: Vec::new(),
            options: ExportOptions::default(),
        })
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current total duration; `None` once exported.
    pub fn duration(&self) -> Option<f64> {
        self.base.as_ref().map(MediaClip::duration)
    }

    pub fn base(&self) -> Option<&MediaClip> {
        self.base.as_ref()
    }

    pub fn audio(&self) -> Option<&BoundAudio> {
        self.audio.as_ref()
    }

    pub fn caption(&self) -> Option<&CaptionLayout> {
        self.caption.as_ref()
    }

    pub fn overlays(&self) -> &[OverlayLayer] {
        &self.overlays
    }

    /// Cut the base clip to `[start, end)` of its source before retiming.
    pub fn trim(&mut self, start: f64, end: f64) -> MediaResult<()> {
        self.ensure_not_exported("trim")?;
        if self.stage != Stage::Empty {
            return Err(MediaError::invalid_state(format!(
                "trim must precede every other operation (stage {:?})",
                self.stage
            )));
        }

        let trimmed = self.current_base()?.trimmed(start, end)?;
        debug!(start, end = trimmed.window().1, "Trimmed base clip");
        self.base = Some(trimmed);
        Ok(())
    }

    /// Retime the base clip; the duration becomes `duration / factor`.
    pub fn change_speed(&mut self, factor: f64) -> MediaResult<()> {
        self.ensure_stage(Stage::SpeedApplied, "change_speed")?;
        if self.stage == Stage::SpeedApplied {
            return Err(MediaError::invalid_state("speed already applied"));
        }

        let retimed = self.current_base()?.with_speed(factor)?;
        info!(factor, duration = retimed.duration(), "Applied speed change");
        self.base = Some(retimed);
        self.stage = Stage::SpeedApplied;
        Ok(())
    }

    /// Bind `track` at `volume`, looping or truncating it to the
    /// composition duration. Replaces any previously bound track.
    pub fn attach_audio(&mut self, track: AudioTrack, volume: f64) -> MediaResult<()> {
        self.ensure_stage(Stage::AudioBound, "attach_audio")?;

        let target = self.current_base()?.duration();
        let bound = BoundAudio::bind(track.with_volume(volume)?, target)?;
        info!(
            track = %bound.track.path().display(),
            track_duration = bound.track.duration(),
            repeats = bound.fit.repeats,
            duration = bound.duration(),
            "Bound audio track"
        );

        if let Some(previous) = self.audio.replace(bound) {
            debug!(track = %previous.track.path().display(), "Released previous audio track");
        }
        self.stage = Stage::AudioBound;
        Ok(())
    }

    /// Apply `effects` in order as one batch.
    pub fn apply_effects(&mut self, effects: &[EffectSpec]) -> MediaResult<()> {
        self.ensure_stage(Stage::EffectsApplied, "apply_effects")?;
        if effects.is_empty() {
            return Ok(());
        }

        let updated = self.current_base()?.with_effects(effects)?;
        info!(
            effects = %effects.iter().map(ToString::to_string).collect::<Vec<_>>().join(" "),
            "Applied effects"
        );
        self.base = Some(updated);
        self.stage = Stage::EffectsApplied;
        Ok(())
    }

    /// Parse `name` / `name-value` tokens and apply the valid ones.
    ///
    /// Returns how many effects were applied.
    pub fn apply_effect_tokens<S: AsRef<str>>(&mut self, tokens: &[S]) -> MediaResult<usize> {
        self.ensure_stage(Stage::EffectsApplied, "apply_effects")?;
        let effects = parse_effects(tokens);
        self.apply_effects(&effects)?;
        Ok(effects.len())
    }

    /// Letterbox the base clip into `canvas`.
    pub fn fit_canvas(&mut self, canvas: &CanvasSpec) -> MediaResult<()> {
        self.ensure_stage(Stage::EffectsApplied, "fit_canvas")?;

        let fitted = self.current_base()?.fitted(canvas)?;
        info!(width = canvas.width, height = canvas.height, "Fitted base clip to canvas");
        self.base = Some(fitted);
        self.stage = Stage::EffectsApplied;
        Ok(())
    }

    /// Set the caption, replacing any earlier one.
    pub fn add_text_overlay(&mut self, spec: &TextOverlaySpec) -> MediaResult<()> {
        self.ensure_stage(Stage::Overlaid, "add_text_overlay")?;

        let base = self.current_base()?;
        let layout = CaptionLayout::new(spec, base.frame_size(), base.duration())?;
        info!(lines = layout.lines.len(), top = layout.top, height = layout.height(), "Laid out caption");

        self.caption = Some(layout);
        self.stage = Stage::Overlaid;
        Ok(())
    }

    /// Stack `clip` above everything added so far.
    pub fn add_overlay(&mut self, clip: MediaClip, placement: OverlayPlacement) -> MediaResult<()> {
        self.ensure_stage(Stage::Overlaid, "add_overlay")?;

        let total = self.current_base()?.duration();
        let layer = OverlayLayer::new(clip, placement, total)?;
        info!(
            overlay = %layer.clip.path().display(),
            start = layer.window.0,
            end = layer.window.1,
            "Added overlay"
        );

        self.overlays.push(layer);
        self.stage = Stage::Overlaid;
        Ok(())
    }

    /// Freeze the current composition into a render plan.
    pub fn plan(&self) -> MediaResult<RenderPlan> {
        self.ensure_not_exported("plan")?;
        RenderPlan::build(
            self.current_base()?,
            self.audio.as_ref(),
            &self.overlays,
            self.caption.as_ref(),
            &self.options,
        )
    }

    /// Encode to `output`, then release everything the composition holds.
    pub async fn export(&mut self, output: impl AsRef<Path>) -> MediaResult<ExportReport> {
        self.ensure_not_exported("export")?;

        let plan = self.plan();
        self.release();
        let plan = plan?;

        Exporter::new(Arc::clone(&self.backend))
            .render(&plan, output)
            .await
    }

    fn release(&mut self) {
        self.base = None;
        self.audio = None;
        self.caption = None;
        self.overlays.clear();
        self.stage = Stage::Exported;
        debug!("Released composition resources");
    }

    fn current_base(&self) -> MediaResult<&MediaClip> {
        self.base
            .as_ref()
            .ok_or_else(|| MediaError::invalid_state("composition already exported"))
    }

    fn ensure_not_exported(&self, op: &str) -> MediaResult<()> {
        if self.stage == Stage::Exported {
            return Err(MediaError::invalid_state(format!(
                "{op} called after export"
            )));
        }
        Ok(())
    }

    fn ensure_stage(&self, target: Stage, op: &str) -> MediaResult<()> {
        self.ensure_not_exported(op)?;
        if self.stage > target {
            return Err(MediaError::invalid_state(format!(
                "{op} belongs to stage {target:?} but composition is at {:?}",
                self.stage
            )));
        }
        Ok(())
    }
}
