//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Root under which the default directories live.
const DEFAULT_DATA_DIR: &str = "/tmp/reelcraft";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Source videos rendered when no manifest is given
    pub input_dir: PathBuf,
    /// Finished renders
    pub processed_dir: PathBuf,
    /// Background music library
    pub music_dir: PathBuf,
    /// Publishing identities (`*.cookie` files)
    pub cookies_dir: PathBuf,
    /// Resolved remote sources
    pub download_dir: PathBuf,
    /// Scratch space for adaptive stream halves
    pub work_dir: PathBuf,
    /// Netscape cookies file handed to yt-dlp
    pub ytdlp_cookies: Option<PathBuf>,
    /// Maximum compositions rendered at once
    pub max_concurrent_jobs: usize,
    /// Upper bound on one job, resolution through publish
    pub job_timeout: Duration,
    /// Upper bound on a single ffmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Font for captions that do not name one
    pub default_font: Option<String>,
    /// JSON list of render jobs
    pub manifest: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl WorkerConfig {
    /// Default layout below `root`.
    pub fn with_data_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            input_dir: root.join("input"),
            processed_dir: root.join("processed"),
            music_dir: root.join("music"),
            cookies_dir: root.join("cookies"),
            download_dir: root.join("downloads"),
            work_dir: root.join("work"),
            ytdlp_cookies: None,
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(1800), // 30 minutes
            ffmpeg_timeout: Duration::from_secs(900),
            default_font: None,
            manifest: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let root = std::env::var("REELCRAFT_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let defaults = Self::with_data_dir(root);

        Self {
            input_dir: env_path("REELCRAFT_INPUT_DIR").unwrap_or(defaults.input_dir),
            processed_dir: env_path("REELCRAFT_PROCESSED_DIR").unwrap_or(defaults.processed_dir),
            music_dir: env_path("REELCRAFT_MUSIC_DIR").unwrap_or(defaults.music_dir),
            cookies_dir: env_path("REELCRAFT_COOKIES_DIR").unwrap_or(defaults.cookies_dir),
            download_dir: env_path("REELCRAFT_DOWNLOAD_DIR").unwrap_or(defaults.download_dir),
            work_dir: env_path("REELCRAFT_WORK_DIR").unwrap_or(defaults.work_dir),
            ytdlp_cookies: env_path("YTDLP_COOKIES"),
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            job_timeout: std::env::var("WORKER_JOB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            ffmpeg_timeout: std::env::var("WORKER_FFMPEG_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
            default_font: std::env::var("REELCRAFT_DEFAULT_FONT").ok().filter(|s| !s.is_empty()),
            manifest: env_path("RENDER_MANIFEST"),
        }
    }

    /// Every directory the worker writes to or reads from.
    pub fn directories(&self) -> [&PathBuf; 6] {
        [
            &self.input_dir,
            &self.processed_dir,
            &self.music_dir,
            &self.cookies_dir,
            &self.download_dir,
            &self.work_dir,
        ]
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = WorkerConfig::with_data_dir("/srv/reels");
        assert_eq!(config.input_dir, PathBuf::from("/srv/reels/input"));
        assert_eq!(config.processed_dir, PathBuf::from("/srv/reels/processed"));
        assert_eq!(config.work_dir, PathBuf::from("/srv/reels/work"));
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(config.manifest.is_none());
    }

    #[test]
    fn test_directories_are_distinct() {
        let config = WorkerConfig::default();
        let dirs = config.directories();
        for (i, a) in dirs.iter().enumerate() {
            for b in &dirs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
