//! Media backend seam.
//!
//! Everything above this module describes work as [`FfmpegCommand`] values
//! and probe requests. The backend decides how they are executed, which lets
//! the composition pipeline run against a recording fake in tests.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;
use tracing::trace;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};
use crate::progress::FfmpegProgress;

/// Executes probes and encodes.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Read container and stream metadata.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Run an encode/mux command to completion.
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()>;
}

/// Backend driving the `ffprobe` and `ffmpeg` executables.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    runner: FfmpegRunner,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any encode running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Abort encodes when `cancel_rx` flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel_rx);
        self
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let total = cmd.planned_duration().unwrap_or_default();
        let output = cmd.output().display().to_string();

        self.runner
            .run_with_progress(cmd, move |progress: FfmpegProgress| {
                trace!(
                    output = %output,
                    frame = progress.frame,
                    percent = progress.percentage(total),
                    eta = ?progress.eta_seconds(total),
                    speed = progress.speed,
                    "Encode progress"
                );
            })
            .await
    }
}
