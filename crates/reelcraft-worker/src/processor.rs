//! Turning a render job into a finished video.

use reelcraft_media::{
    is_remote_ref, AudioTrack, Composition, ExportReport, FfmpegBackend, MediaBackend, MediaClip,
    ResolverConfig, SelectorConfig, SourceResolver, StreamSelector, YtDlp,
};
use reelcraft_models::{AudioChoice, AudioRequest, RenderJob};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::catalog::AssetCatalog;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::publisher::{PublishReceipt, PublishRequest, Publisher};

/// Result of one successful job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub source: String,
    pub report: ExportReport,
    pub published: Option<PublishReceipt>,
}

/// Renders jobs against shared collaborators.
pub struct RenderProcessor {
    backend: Arc<dyn MediaBackend>,
    resolver: SourceResolver,
    catalog: AssetCatalog,
    publisher: Arc<dyn Publisher>,
    default_font: Option<String>,
}

impl RenderProcessor {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        resolver: SourceResolver,
        catalog: AssetCatalog,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            backend,
            resolver,
            catalog,
            publisher,
            default_font: None,
        }
    }

    /// Wire up ffmpeg, yt-dlp and the catalog directories from `config`.
    ///
    /// `cancel_rx` aborts running encodes and pending waits when it flips
    /// to `true`.
    pub fn from_config(
        config: &WorkerConfig,
        publisher: Arc<dyn Publisher>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Self {
        let backend: Arc<dyn MediaBackend> = Arc::new(
            FfmpegBackend::new()
                .with_timeout(config.ffmpeg_timeout.as_secs())
                .with_cancel(cancel_rx.clone()),
        );

        let mut ytdlp = YtDlp::new();
        if let Some(cookies) = &config.ytdlp_cookies {
            ytdlp = ytdlp.with_cookies(cookies);
        }

        let selector = StreamSelector::new(
            Arc::new(ytdlp),
            Arc::clone(&backend),
            SelectorConfig::new(&config.download_dir, &config.work_dir),
        )
        .with_cancel(cancel_rx.clone());

        let resolver = SourceResolver::new(Arc::clone(&backend), ResolverConfig::default())
            .with_selector(selector)
            .with_cancel(cancel_rx);

        let mut processor = Self::new(backend, resolver, AssetCatalog::from_config(config), publisher);
        processor.default_font = config.default_font.clone();
        processor
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Resolve, compose, export and optionally publish one job.
    pub async fn process(&self, job_id: &str, job: &RenderJob) -> WorkerResult<JobOutcome> {
        let logger = JobLogger::new(job_id, "render");
        logger.log_start(&job.source);

        let base = self.resolver.resolve(&self.source_ref(&job.source)).await?;
        let mut comp = Composition::new(Arc::clone(&self.backend), base)?;

        if let Some(window) = job.trim {
            comp.trim(window.start, window.end)?;
        }
        if let Some(speed) = job.speed {
            comp.change_speed(speed)?;
        }
        if let Some(request) = &job.audio {
            match self.open_audio(request).await? {
                Some(track) => comp.attach_audio(track, request.volume)?,
                None => logger.log_warning("music library is empty, keeping original audio"),
            }
        }

        if !job.effects.is_empty() {
            let applied = comp.apply_effect_tokens(&job.effects)?;
            if applied < job.effects.len() {
                logger.log_warning(&format!(
                    "applied {applied} of {} effects",
                    job.effects.len()
                ));
            }
        }
        if let Some(canvas) = &job.canvas {
            comp.fit_canvas(canvas)?;
        }

        for overlay in &job.overlays {
            let path = self.catalog.input_path(&overlay.path);
            let added = match MediaClip::open(self.backend.as_ref(), &path).await {
                Ok(clip) => comp.add_overlay(clip, overlay.placement),
                Err(e) => Err(e),
            };
            if let Err(e) = added {
                logger.log_warning(&format!("skipping overlay {}: {e}", path.display()));
            }
        }

        if let Some(text) = &job.text {
            let mut spec = text.clone();
            if spec.font_face.is_none() {
                spec.font_face = self.default_font.clone();
            }
            comp.add_text_overlay(&spec)?;
        }

        logger.log_progress("composition ready, exporting");
        let output = self.catalog.processed_path(&job.output);
        let report = comp.export(&output).await?;

        let published = match &job.publish {
            Some(spec) => {
                let cookie = self
                    .catalog
                    .identity_cookie(&spec.identity)
                    .await?
                    .ok_or_else(|| {
                        WorkerError::publish_failed(format!("unknown identity {}", spec.identity))
                    })?;
                let request = PublishRequest::new(&report.path, cookie, spec);
                Some(self.publisher.publish(&request).await?)
            }
            None => None,
        };

        logger.log_completion(&format!(
            "{} ({:.2}s, {} frames)",
            report.path.display(),
            report.duration,
            report.frame_count
        ));

        Ok(JobOutcome {
            job_id: job_id.to_string(),
            source: job.source.clone(),
            report,
            published,
        })
    }

    /// Remote refs pass through; local ones resolve against the input dir.
    fn source_ref(&self, source: &str) -> String {
        if is_remote_ref(source) {
            source.to_string()
        } else {
            self.catalog.input_path(source).to_string_lossy().into_owned()
        }
    }

    async fn open_audio(&self, request: &AudioRequest) -> WorkerResult<Option<AudioTrack>> {
        let path: PathBuf = match &request.source {
            AudioChoice::File(name) => self.catalog.music_path(name),
            AudioChoice::Random => match self.catalog.random_music().await? {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        let mut track = AudioTrack::open(self.backend.as_ref(), &path).await?;
        if request.start_offset > 0.0 {
            track = track.with_offset(request.start_offset)?;
        }
        Ok(Some(track))
    }
}
