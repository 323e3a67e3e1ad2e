//! Remote stream access through yt-dlp.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::catalog::{StreamCatalog, StreamKind, StreamVariant};
use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Lists and downloads the variants of remote videos.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Enumerate the variants of `remote_ref`, best first within each kind.
    async fn catalog(&self, remote_ref: &str) -> MediaResult<StreamCatalog>;

    /// Download one variant to `dest`.
    async fn download(&self, remote_ref: &str, variant: &StreamVariant, dest: &Path) -> MediaResult<()>;
}

/// `yt-dlp` backed [`StreamSource`].
#[derive(Debug, Clone, Default)]
pub struct YtDlp {
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate with a Netscape cookies file.
    pub fn with_cookies(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(path.into());
        self
    }

    /// Cookies file to pass, if it exists and looks valid.
    async fn usable_cookies(&self) -> Option<&Path> {
        let path = self.cookies.as_deref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(content) if is_valid_netscape_cookies(&content) => Some(path),
            Ok(_) => {
                warn!(path = %path.display(), "Cookies file is not in Netscape format, ignoring");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read cookies file, ignoring");
                None
            }
        }
    }

    async fn run(&self, args: Vec<String>) -> MediaResult<Vec<u8>> {
        check_ytdlp()?;

        let mut args = args;
        if let Some(cookies) = self.usable_cookies().await {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        debug!("Running yt-dlp {}", args.join(" "));

        let output = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let last = stderr.lines().last().unwrap_or("Unknown error");
            return Err(MediaError::download_failed(format!("yt-dlp failed: {}", last)));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl StreamSource for YtDlp {
    async fn catalog(&self, remote_ref: &str) -> MediaResult<StreamCatalog> {
        let stdout = self
            .run(vec![
                "-J".to_string(),
                "--no-playlist".to_string(),
                remote_ref.to_string(),
            ])
            .await?;

        let catalog = parse_catalog(&stdout)?;
        info!(
            id = %catalog.id,
            variants = catalog.variants.len(),
            "Fetched stream catalog"
        );
        Ok(catalog)
    }

    async fn download(&self, remote_ref: &str, variant: &StreamVariant, dest: &Path) -> MediaResult<()> {
        info!(
            variant = %variant.id,
            kind = ?variant.kind,
            dest = %dest.display(),
            "Downloading stream variant"
        );

        self.run(vec![
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "--force-overwrites".to_string(),
            "-f".to_string(),
            variant.id.clone(),
            "-o".to_string(),
            dest.to_string_lossy().to_string(),
            remote_ref.to_string(),
        ])
        .await?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    id: String,
    title: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    abr: Option<f64>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().map(|c| c != "none").unwrap_or(false)
}

/// Turn `yt-dlp -J` output into a catalog, best variants first.
fn parse_catalog(json: &[u8]) -> MediaResult<StreamCatalog> {
    let info: InfoJson = serde_json::from_slice(json)?;

    let mut entries: Vec<(StreamVariant, f64)> = info
        .formats
        .into_iter()
        .filter_map(|f| {
            let kind = match (has_codec(&f.vcodec), has_codec(&f.acodec)) {
                (true, true) => StreamKind::Progressive,
                (true, false) => StreamKind::VideoOnly,
                (false, true) => StreamKind::AudioOnly,
                // Storyboards and other non-media formats
                (false, false) => return None,
            };
            let variant = StreamVariant::new(f.format_id, kind, f.ext.unwrap_or_default(), f.height);
            Some((variant, f.abr.unwrap_or(0.0)))
        })
        .collect();

    // yt-dlp lists worst first
    entries.sort_by(|(a, a_abr), (b, b_abr)| {
        b.height
            .unwrap_or(0)
            .cmp(&a.height.unwrap_or(0))
            .then_with(|| b_abr.total_cmp(a_abr))
    });

    Ok(StreamCatalog {
        id: info.id,
        title: info.title,
        variants: entries.into_iter().map(|(v, _)| v).collect(),
    })
}

/// Whether `content` looks like a Netscape cookies file.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File") || content.starts_with("# HTTP Cookie File") {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}
