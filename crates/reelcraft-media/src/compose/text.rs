//! Caption layout.
//!
//! Text is wrapped greedily to the caption box using an average glyph
//! advance, so the block height follows directly from the line count. Each
//! line becomes its own `drawtext` filter, centered horizontally.

use reelcraft_models::TextOverlaySpec;
use tracing::warn;

use crate::error::{MediaError, MediaResult};
use crate::filters::{escape_drawtext, escape_filter_value};

/// Average glyph advance, in tenths of the font size.
const GLYPH_ADVANCE_TENTHS: u32 = 6;
/// Baseline-to-baseline distance, in tenths of the font size.
const LINE_SPACING_TENTHS: u32 = 12;
/// Largest accepted font size, in pixels.
pub const MAX_FONT_SIZE: u32 = 2000;

/// A caption wrapped and positioned for one frame size.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub spec: TextOverlaySpec,
    pub lines: Vec<String>,
    /// Width the text was wrapped to, in pixels
    pub box_width: u32,
    pub line_height: u32,
    /// Top edge of the block, in pixels from the frame top
    pub top: u32,
    /// Seconds the caption stays on screen
    pub duration: f64,
}

impl CaptionLayout {
    /// Wrap and position `spec` on a `frame` of `(width, height)`.
    pub fn new(spec: &TextOverlaySpec, frame: (u32, u32), duration: f64) -> MediaResult<Self> {
        let (frame_width, frame_height) = frame;

        if spec.text.trim().is_empty() {
            return Err(MediaError::invalid_parameter("caption text is empty"));
        }
        if spec.font_size == 0 || spec.font_size > MAX_FONT_SIZE {
            return Err(MediaError::invalid_parameter(format!(
                "font size must be within 1..={MAX_FONT_SIZE}, got {}",
                spec.font_size
            )));
        }
        if !(0.0..=1.0).contains(&spec.vertical_position) {
            return Err(MediaError::invalid_parameter(format!(
                "vertical position must be within [0, 1], got {}",
                spec.vertical_position
            )));
        }

        let box_width = spec.box_width.unwrap_or(frame_width).min(frame_width);
        if box_width == 0 {
            return Err(MediaError::invalid_parameter("caption box width must be > 0"));
        }

        let advance_tenths = u64::from(spec.font_size) * u64::from(GLYPH_ADVANCE_TENTHS);
        let max_chars = ((u64::from(box_width) * 10 / advance_tenths) as usize).max(1);
        let lines = wrap_words(&spec.text, max_chars);

        let line_height = spec.font_size * LINE_SPACING_TENTHS / 10;
        let top = (spec.vertical_position * frame_height as f64).round() as u32;

        let layout = Self {
            spec: spec.clone(),
            lines,
            box_width,
            line_height,
            top,
            duration,
        };

        if layout.top.saturating_add(layout.height()) > frame_height {
            warn!(
                lines = layout.lines.len(),
                height = layout.height(),
                frame_height,
                "Caption extends past the bottom of the frame"
            );
        }

        Ok(layout)
    }

    /// Total block height in pixels.
    pub fn height(&self) -> u32 {
        u32::try_from(self.lines.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.line_height)
    }

    /// One `drawtext` per line, joined into a filter chain.
    pub fn filter(&self) -> String {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| self.drawtext(i, line))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn drawtext(&self, index: usize, line: &str) -> String {
        let spec = &self.spec;
        let mut filter = format!(
            "drawtext=text={}:fontsize={}:fontcolor={}:borderw={}:bordercolor={}",
            escape_drawtext(line),
            spec.font_size,
            escape_filter_value(&spec.color),
            spec.stroke_width,
            escape_filter_value(&spec.stroke_color),
        );

        if let Some(face) = &spec.font_face {
            let key = if is_font_file(face) { "fontfile" } else { "font" };
            filter.push_str(&format!(":{}={}", key, escape_filter_value(face)));
        }

        let offset = u32::try_from(index).unwrap_or(u32::MAX).saturating_mul(self.line_height);
        let y = self.top.saturating_add(offset);
        filter.push_str(&format!(
            ":x=(w-text_w)/2:y={}:enable='between(t,0,{})'",
            y, self.duration
        ));
        filter
    }
}

fn is_font_file(face: &str) -> bool {
    let lower = face.to_ascii_lowercase();
    face.contains('/') || lower.ends_with(".ttf") || lower.ends_with(".otf")
}

/// Greedy word wrap to at most `max_chars` per line.
///
/// Words longer than a line are split across lines.
fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
