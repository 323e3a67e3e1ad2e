//! Stream selection and download for remote sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use super::catalog::{choose_streams, SelectionRules, StreamCatalog, StreamChoice, StreamVariant};
use super::ytdlp::StreamSource;
use crate::backend::MediaBackend;
use crate::command::{FfmpegCommand, FfmpegInput};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::sibling_temp_path;
use crate::metrics;
use crate::wait::{wait_until_exists, WaitError, WaitPolicy};

/// Where and how remote sources are fetched.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Final location of resolved remote sources
    pub download_dir: PathBuf,
    /// Scratch space for adaptive halves before muxing
    pub work_dir: PathBuf,
    pub rules: SelectionRules,
    /// Wait for both adaptive halves to appear
    pub merge_wait: WaitPolicy,
}

impl SelectorConfig {
    pub fn new(download_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            work_dir: work_dir.into(),
            rules: SelectionRules::default(),
            merge_wait: WaitPolicy::merge_default(),
        }
    }

    pub fn with_rules(mut self, rules: SelectionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_merge_wait(mut self, policy: WaitPolicy) -> Self {
        self.merge_wait = policy;
        self
    }
}

/// Picks, downloads and if necessary muxes the streams of a remote video.
#[derive(Clone)]
pub struct StreamSelector {
    source: Arc<dyn StreamSource>,
    backend: Arc<dyn MediaBackend>,
    config: SelectorConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl StreamSelector {
    pub fn new(source: Arc<dyn StreamSource>, backend: Arc<dyn MediaBackend>, config: SelectorConfig) -> Self {
        Self {
            source,
            backend,
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Resolve `remote_ref` to a local file in the download directory.
    pub async fn select_stream(&self, remote_ref: &str) -> MediaResult<PathBuf> {
        let catalog = self.source.catalog(remote_ref).await?;
        let choice = choose_streams(&catalog, &self.config.rules)?;
        metrics::record_stream_selection(choice.path_label());

        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        match choice {
            StreamChoice::Progressive(variant) => {
                info!(remote = remote_ref, variant = %variant.id, height = ?variant.height, "Selected progressive stream");
                self.download_progressive(remote_ref, &catalog, &variant).await
            }
            StreamChoice::Adaptive { video, audio } => {
                info!(
                    remote = remote_ref,
                    video = %video.id,
                    audio = %audio.id,
                    height = ?video.height,
                    "Selected adaptive stream pair"
                );
                self.download_adaptive(remote_ref, &catalog, &video, &audio).await
            }
        }
    }

    async fn download_progressive(
        &self,
        remote_ref: &str,
        catalog: &StreamCatalog,
        variant: &StreamVariant,
    ) -> MediaResult<PathBuf> {
        let dest = self.final_path(catalog, &variant.container);
        let staging = sibling_temp_path(&dest, &format!(".{}", variant.container))?;

        self.fetch(remote_ref, variant, &staging).await?;
        staging.persist(&dest).map_err(|e| MediaError::from(e.error))?;
        Ok(dest)
    }

    async fn download_adaptive(
        &self,
        remote_ref: &str,
        catalog: &StreamCatalog,
        video: &StreamVariant,
        audio: &StreamVariant,
    ) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let stem = format!("{}-{}", file_stem(&catalog.id), Uuid::new_v4().simple());
        let video_path = TempPath::from_path(
            self.config.work_dir.join(format!("{}.video.{}", stem, video.container)),
        );
        let audio_path = TempPath::from_path(
            self.config.work_dir.join(format!("{}.audio.{}", stem, audio.container)),
        );

        let (video_result, audio_result) = tokio::join!(
            self.fetch(remote_ref, video, &video_path),
            self.fetch(remote_ref, audio, &audio_path),
        );
        video_result?;
        audio_result?;

        let halves: [&Path; 2] = [&video_path, &audio_path];
        wait_until_exists(&halves, &self.config.merge_wait, self.cancel.clone())
            .await
            .map_err(|e| match e {
                WaitError::Exhausted { missing, checks } => MediaError::MergeTimeout {
                    missing,
                    attempts: checks,
                },
                WaitError::Cancelled => MediaError::Cancelled,
            })?;

        let dest = self.final_path(catalog, "mp4");
        self.mux(&video_path, &audio_path, &dest).await?;

        info!(output = %dest.display(), "Muxed adaptive streams");
        Ok(dest)
    }

    /// Combine the first video and first audio stream without re-encoding video.
    async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> MediaResult<()> {
        let staging = sibling_temp_path(dest, ".mp4")?;

        let cmd = FfmpegCommand::with_inputs(vec![FfmpegInput::new(video), FfmpegInput::new(audio)], &staging)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .audio_codec("aac")
            .format("mp4");

        self.backend
            .run(&cmd)
            .await
            .map_err(|e| MediaError::MuxError(e.to_string()))?;

        staging
            .persist(dest)
            .map_err(|e| MediaError::MuxError(format!("cannot move muxed file into place: {}", e.error)))?;
        Ok(())
    }

    async fn fetch(&self, remote_ref: &str, variant: &StreamVariant, dest: &Path) -> MediaResult<()> {
        let result = self.source.download(remote_ref, variant, dest).await;
        metrics::record_download(result.is_ok());
        if let Err(e) = &result {
            warn!(variant = %variant.id, error = %e, "Variant download failed");
        }
        result
    }

    /// Fresh path per selection; concurrent jobs may share a remote ref.
    fn final_path(&self, catalog: &StreamCatalog, extension: &str) -> PathBuf {
        let tag = Uuid::new_v4().simple().to_string();
        self.config
            .download_dir
            .join(format!("{}-{}.{}", file_stem(&catalog.id), &tag[..8], extension))
    }
}

/// Filesystem-safe version of a remote video id.
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "video".to_string()
    } else {
        stem
    }
}
