//! Source resolution: turn a source reference into an opened clip.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

use super::selector::StreamSelector;
use crate::backend::MediaBackend;
use crate::clip::MediaClip;
use crate::error::{MediaError, MediaResult};
use crate::wait::{wait_until_exists, WaitError, WaitPolicy};

/// Containers accepted as composition sources.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Hosts whose URLs are resolved through the stream selector.
pub const REMOTE_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "twitter.com",
    "x.com",
    "twitch.tv",
    "tiktok.com",
];

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Lowercase extensions without the dot
    pub accepted_extensions: Vec<String>,
    /// Wait for a resolved file to become visible
    pub visibility_wait: WaitPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accepted_extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            visibility_wait: WaitPolicy::visibility_default(),
        }
    }
}

impl ResolverConfig {
    /// Whether `path` has an accepted container extension.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.accepted_extensions.iter().any(|a| *a == e)
            })
            .unwrap_or(false)
    }
}

/// Whether `source_ref` is a URL on a recognized video host.
pub fn is_remote_ref(source_ref: &str) -> bool {
    let Ok(url) = Url::parse(source_ref) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    REMOTE_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

/// Resolves local paths and remote references to opened clips.
pub struct SourceResolver {
    backend: Arc<dyn MediaBackend>,
    selector: Option<StreamSelector>,
    config: ResolverConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl SourceResolver {
    pub fn new(backend: Arc<dyn MediaBackend>, config: ResolverConfig) -> Self {
        Self {
            backend,
            selector: None,
            config,
            cancel: None,
        }
    }

    /// Enable remote references.
    pub fn with_selector(mut self, selector: StreamSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel_rx);
        self
    }

    /// Resolve `source_ref` to a local file path without opening it.
    pub async fn resolve_path(&self, source_ref: &str) -> MediaResult<PathBuf> {
        let path = if is_remote_ref(source_ref) {
            let selector = self.selector.as_ref().ok_or_else(|| {
                MediaError::invalid_parameter(format!(
                    "remote source {source_ref} given but remote resolution is disabled"
                ))
            })?;
            selector.select_stream(source_ref).await?
        } else {
            PathBuf::from(source_ref)
        };

        if !self.config.accepts(&path) {
            return Err(MediaError::InvalidFormat(path.display().to_string()));
        }

        wait_until_exists(&[&path], &self.config.visibility_wait, self.cancel.clone())
            .await
            .map_err(|e| match e {
                WaitError::Exhausted { checks, .. } => MediaError::SourceUnavailable {
                    path: path.clone(),
                    attempts: checks,
                },
                WaitError::Cancelled => MediaError::Cancelled,
            })?;

        debug!(source = source_ref, path = %path.display(), "Source visible");
        Ok(path)
    }

    /// Resolve and open `source_ref` as a clip.
    pub async fn resolve(&self, source_ref: &str) -> MediaResult<MediaClip> {
        let path = self.resolve_path(source_ref).await?;
        let clip = MediaClip::open(self.backend.as_ref(), &path).await?;

        info!(
            source = source_ref,
            path = %path.display(),
            duration = clip.duration(),
            width = clip.frame_size().0,
            height = clip.frame_size().1,
            "Resolved source"
        );
        Ok(clip)
    }
}
