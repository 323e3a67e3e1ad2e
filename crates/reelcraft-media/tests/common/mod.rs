//! Scriptable fakes for driving the pipeline without ffmpeg or yt-dlp.

#![allow(dead_code)]

use async_trait::async_trait;
use reelcraft_media::{
    FfmpegCommand, MediaBackend, MediaError, MediaInfo, MediaResult, StreamCatalog, StreamSource,
    StreamVariant,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Records every command, fabricates output files and can inject failures.
#[derive(Default)]
pub struct FakeBackend {
    media: Mutex<HashMap<PathBuf, MediaInfo>>,
    fallback: Mutex<Option<MediaInfo>>,
    commands: Mutex<Vec<FfmpegCommand>>,
    fail_runs: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe result for `path` (matched by full path or file name).
    pub fn with_media(self, path: impl Into<PathBuf>, info: MediaInfo) -> Self {
        self.media.lock().unwrap().insert(path.into(), info);
        self
    }

    /// Probe result for any path not registered explicitly.
    pub fn with_fallback(self, info: MediaInfo) -> Self {
        *self.fallback.lock().unwrap() = Some(info);
        self
    }

    /// Make every subsequent encode fail after writing partial output.
    pub fn fail_runs(&self, fail: bool) {
        self.fail_runs.store(fail, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<FfmpegCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn last_command(&self) -> FfmpegCommand {
        self.commands().last().cloned().expect("no command recorded")
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        let media = self.media.lock().unwrap();
        let by_name = path.file_name().map(PathBuf::from);

        media
            .get(path)
            .or_else(|| by_name.as_ref().and_then(|name| media.get(name)))
            .cloned()
            .or_else(|| self.fallback.lock().unwrap().clone())
            .ok_or_else(|| MediaError::FfprobeFailed {
                message: format!("unreadable container: {}", path.display()),
                stderr: None,
            })
    }

    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.commands.lock().unwrap().push(cmd.clone());

        if self.fail_runs.load(Ordering::SeqCst) {
            std::fs::write(cmd.output(), b"partial")?;
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }

        std::fs::write(cmd.output(), b"encoded")?;
        Ok(())
    }
}

/// In-memory stream source serving one catalog.
pub struct FakeSource {
    catalog: StreamCatalog,
    downloads: Mutex<Vec<String>>,
    /// Variant ids whose download "succeeds" without producing a file
    vanish: HashSet<String>,
    /// Variant ids whose download fails
    broken: HashSet<String>,
}

impl FakeSource {
    pub fn new(catalog: StreamCatalog) -> Self {
        Self {
            catalog,
            downloads: Mutex::new(Vec::new()),
            vanish: HashSet::new(),
            broken: HashSet::new(),
        }
    }

    pub fn vanishing(mut self, variant_id: &str) -> Self {
        self.vanish.insert(variant_id.to_string());
        self
    }

    pub fn broken(mut self, variant_id: &str) -> Self {
        self.broken.insert(variant_id.to_string());
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamSource for FakeSource {
    async fn catalog(&self, _remote_ref: &str) -> MediaResult<StreamCatalog> {
        Ok(self.catalog.clone())
    }

    async fn download(&self, _remote_ref: &str, variant: &StreamVariant, dest: &Path) -> MediaResult<()> {
        self.downloads.lock().unwrap().push(variant.id.clone());

        if self.broken.contains(&variant.id) {
            return Err(MediaError::download_failed(format!("HTTP 403 for {}", variant.id)));
        }
        if self.vanish.contains(&variant.id) {
            let _ = std::fs::remove_file(dest);
            return Ok(());
        }

        std::fs::write(dest, variant.id.as_bytes())?;
        Ok(())
    }
}

pub fn video_info(duration: f64, width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        duration,
        width,
        height,
        fps: 30.0,
        video_codec: Some("h264".to_string()),
        audio_codec: Some("aac".to_string()),
        size: 1_000_000,
        bitrate: 800_000,
    }
}

pub fn silent_video_info(duration: f64, width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        audio_codec: None,
        ..video_info(duration, width, height)
    }
}

pub fn audio_info(duration: f64) -> MediaInfo {
    MediaInfo {
        duration,
        fps: 0.0,
        video_codec: None,
        audio_codec: Some("mp3".to_string()),
        ..Default::default()
    }
}

pub fn image_info(width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        duration: 0.04,
        width,
        height,
        fps: 25.0,
        video_codec: Some("png".to_string()),
        audio_codec: None,
        ..Default::default()
    }
}

/// Every argument of `cmd` joined with spaces.
pub fn argv(cmd: &FfmpegCommand) -> String {
    cmd.build_args().join(" ")
}

/// Files in `dir`, by name.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
