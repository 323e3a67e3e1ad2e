//! Render plans and the exporter.
//!
//! A [`RenderPlan`] is a frozen description of the final encode: inputs,
//! filter graph, stream maps and output geometry. It holds a reference to
//! every source file it reads, so it can be rendered any number of times
//! after the composition that produced it has been released.

use reelcraft_models::encoding::OUTPUT_CONTAINER;
use reelcraft_models::EncodingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::effects::visual_filters;
use super::overlay::OverlayLayer;
use super::text::CaptionLayout;
use super::timeline::{atempo_filters, setpts_filter, BoundAudio};
use crate::backend::MediaBackend;
use crate::clip::{ClipSource, MediaClip};
use crate::command::{FfmpegCommand, FfmpegInput};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_parent_dir, sibling_temp_path};
use crate::metrics;

const VIDEO_OUT: &str = "vout";
const AUDIO_OUT: &str = "aout";

/// Encoder settings applied at export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub encoding: EncodingConfig,
    /// Output frame rate; the base clip's rate when unset
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

impl ExportOptions {
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
    pub has_audio: bool,
}

/// A complete, repeatable encode description.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    inputs: Vec<FfmpegInput>,
    filter_graph: String,
    has_audio: bool,
    duration: f64,
    frame_size: (u32, u32),
    fps: f64,
    encoding: EncodingConfig,
    /// Keeps owned temp sources alive while the plan exists
    sources: Vec<Arc<ClipSource>>,
}

impl RenderPlan {
    /// Compose layers in fixed order: base, overlays in call order, caption last.
    pub(crate) fn build(
        base: &MediaClip,
        audio: Option<&BoundAudio>,
        overlays: &[OverlayLayer],
        caption: Option<&CaptionLayout>,
        options: &ExportOptions,
    ) -> MediaResult<Self> {
        let fps = options.frame_rate.unwrap_or_else(|| base.frame_rate());
        if !fps.is_finite() || fps <= 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "frame rate must be > 0, got {fps}"
            )));
        }

        let mut inputs = vec![base_input(base)];
        let mut sources = vec![Arc::clone(base.source())];
        let mut graph = Vec::new();

        let mut chain = vec![setpts_filter(base.speed())];
        chain.extend(visual_filters(base));
        graph.push(format!("[0:v]{}[base]", chain.join(",")));
        let mut current = "base".to_string();

        for (i, layer) in overlays.iter().enumerate() {
            let index = inputs.len();
            inputs.push(layer.input());
            sources.push(Arc::clone(layer.clip.source()));

            let out = format!("v{}", i + 1);
            graph.push(layer.filter(index, &current, &out));
            current = out;
        }

        if let Some(caption) = caption {
            graph.push(format!("[{}]{}[{}]", current, caption.filter(), VIDEO_OUT));
        } else {
            graph.push(format!("[{}]null[{}]", current, VIDEO_OUT));
        }

        let has_audio = if let Some(bound) = audio {
            let first = inputs.len();
            inputs.extend(bound.inputs());
            sources.push(Arc::clone(bound.track.source()));
            graph.push(bound.filter(first, AUDIO_OUT));
            true
        } else if base.has_audio() {
            let mut chain = vec!["asetpts=PTS-STARTPTS".to_string()];
            chain.extend(atempo_filters(base.speed()));
            graph.push(format!("[0:a]{}[{}]", chain.join(","), AUDIO_OUT));
            true
        } else {
            false
        };

        Ok(Self {
            inputs,
            filter_graph: graph.join(";"),
            has_audio,
            duration: base.duration(),
            frame_size: base.frame_size(),
            fps,
            encoding: options.encoding.clone(),
            sources,
        })
    }

    pub fn inputs(&self) -> &[FfmpegInput] {
        &self.inputs
    }

    pub fn filter_graph(&self) -> &str {
        &self.filter_graph
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration * self.fps).round() as u64
    }

    /// Source files this plan reads.
    pub fn source_paths(&self) -> Vec<&Path> {
        self.sources.iter().map(|s| s.path()).collect()
    }

    /// The encode command writing to `output`.
    pub fn command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::with_inputs(self.inputs.clone(), output)
            .filter_complex(self.filter_graph.clone())
            .map(format!("[{}]", VIDEO_OUT));

        if self.has_audio {
            cmd = cmd.map(format!("[{}]", AUDIO_OUT));
        }

        cmd = cmd
            .output_duration(self.duration)
            .frame_rate(self.fps)
            .output_args(self.encoding.video_args());

        cmd = if self.has_audio {
            cmd.output_args(self.encoding.audio_args())
        } else {
            cmd.output_arg("-an")
        };

        cmd.output_args(self.encoding.extra_args.iter().cloned())
            .output_args(["-movflags", "+faststart"])
            .format(OUTPUT_CONTAINER)
    }

    fn report(&self, path: &Path) -> ExportReport {
        ExportReport {
            path: path.to_path_buf(),
            duration: self.duration,
            width: self.frame_size.0,
            height: self.frame_size.1,
            fps: self.fps,
            frame_count: self.frame_count(),
            has_audio: self.has_audio,
        }
    }
}

fn base_input(base: &MediaClip) -> FfmpegInput {
    let input = FfmpegInput::new(base.path());
    if !base.is_trimmed() {
        return input;
    }
    let (start, end) = base.window();
    input.seek(start).duration(end - start)
}

/// Encodes render plans to container files.
///
/// Output is written to a hidden temp file beside the destination and
/// renamed into place only after a successful encode.
#[derive(Clone)]
pub struct Exporter {
    backend: Arc<dyn MediaBackend>,
}

impl Exporter {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Render `plan` to `output`.
    pub async fn render(&self, plan: &RenderPlan, output: impl AsRef<Path>) -> MediaResult<ExportReport> {
        let output = output.as_ref();
        let started = Instant::now();

        let result = self.render_atomic(plan, output).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_export(result.is_ok(), elapsed);

        match &result {
            Ok(report) => info!(
                output = %output.display(),
                duration = report.duration,
                frames = report.frame_count,
                elapsed_secs = elapsed,
                "Export complete"
            ),
            Err(e) => warn!(output = %output.display(), error = %e, "Export failed"),
        }

        result
    }

    async fn render_atomic(&self, plan: &RenderPlan, output: &Path) -> MediaResult<ExportReport> {
        ensure_parent_dir(output)
            .await
            .map_err(|e| MediaError::ExportError(format!("cannot create output directory: {e}")))?;

        let staging = sibling_temp_path(output, ".mp4")
            .map_err(|e| MediaError::ExportError(format!("cannot reserve temp file: {e}")))?;

        let cmd = plan.command(&staging);
        self.backend.run(&cmd).await.map_err(|e| match e {
            MediaError::Cancelled => MediaError::Cancelled,
            other => MediaError::ExportError(other.to_string()),
        })?;

        let written = tokio::fs::metadata(&staging).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(MediaError::ExportError(
                "encoder produced an empty file".to_string(),
            ));
        }

        staging
            .persist(output)
            .map_err(|e| MediaError::ExportError(format!("cannot move into place: {}", e.error)))?;

        Ok(plan.report(output))
    }
}
