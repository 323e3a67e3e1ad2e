//! Image and video overlays.

use reelcraft_models::{OverlayPlacement, Position};

use crate::clip::MediaClip;
use crate::command::FfmpegInput;
use crate::error::{MediaError, MediaResult};

/// An overlay clip pinned to a time window of the composition.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub clip: MediaClip,
    pub placement: OverlayPlacement,
    /// Window `[start, end]` on the composition timeline
    pub window: (f64, f64),
}

impl OverlayLayer {
    /// Validate `placement` against a composition of `total` seconds.
    ///
    /// A missing duration inherits the rest of the composition. Windows
    /// reaching past the end are clipped to it.
    pub fn new(clip: MediaClip, placement: OverlayPlacement, total: f64) -> MediaResult<Self> {
        let start = placement.start_time;
        if !start.is_finite() || start < 0.0 || start >= total {
            return Err(MediaError::invalid_parameter(format!(
                "overlay start {start} outside [0, {total})"
            )));
        }
        if !(0.0..=1.0).contains(&placement.opacity) {
            return Err(MediaError::invalid_parameter(format!(
                "overlay opacity must be within [0, 1], got {}",
                placement.opacity
            )));
        }

        let end = match placement.duration {
            Some(d) if !d.is_finite() || d <= 0.0 => {
                return Err(MediaError::invalid_parameter(format!(
                    "overlay duration must be > 0, got {d}"
                )));
            }
            Some(d) => (start + d).min(total),
            None => total,
        };

        Ok(Self {
            clip,
            placement,
            window: (start, end),
        })
    }

    pub fn duration(&self) -> f64 {
        self.window.1 - self.window.0
    }

    /// FFmpeg input for the overlay source.
    pub fn input(&self) -> FfmpegInput {
        let input = FfmpegInput::new(self.clip.path());
        if self.clip.is_image() {
            input.loop_image()
        } else {
            input
        }
    }

    /// Filter compositing input `index` onto `[base]`, writing `[out]`.
    pub fn filter(&self, index: usize, base: &str, out: &str) -> String {
        let (start, end) = self.window;
        let layer = format!("ov{}", index);

        let mut prep = String::from("format=rgba");
        if self.placement.opacity < 1.0 {
            prep.push_str(&format!(",colorchannelmixer=aa={}", self.placement.opacity));
        }
        prep.push_str(&format!(",setpts=PTS-STARTPTS+{}/TB", start));

        let (x, y) = match self.placement.position {
            Position::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
            Position::At { x, y } => (x.to_string(), y.to_string()),
        };

        format!(
            "[{index}:v]{prep}[{layer}];\
             [{base}][{layer}]overlay=x={x}:y={y}:enable='between(t,{start},{end})':eof_action=pass[{out}]"
        )
    }
}
