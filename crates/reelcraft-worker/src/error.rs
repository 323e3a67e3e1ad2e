//! Worker error types.

use reelcraft_media::{ErrorKind, MediaError};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Job timed out after {0} seconds")]
    JobTimeout(u64),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn asset_not_found(msg: impl Into<String>) -> Self {
        Self::AssetNotFound(msg.into())
    }

    pub fn invalid_manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short classification used for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            WorkerError::JobFailed(_) => "job_failed",
            WorkerError::JobTimeout(_) => "timeout",
            WorkerError::AssetNotFound(_) => "asset_not_found",
            WorkerError::InvalidManifest(_) => "invalid_manifest",
            WorkerError::PublishFailed(_) => "publish_failed",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Media(MediaError::Cancelled) => "cancelled",
            WorkerError::Media(e) => match e.kind() {
                ErrorKind::InvalidParameter => "invalid_parameter",
                ErrorKind::InvalidFormat => "invalid_format",
                ErrorKind::SourceUnavailable => "source_unavailable",
                ErrorKind::MergeTimeout => "merge_timeout",
                ErrorKind::QualityTooLow => "quality_too_low",
                ErrorKind::NoPlayableStream => "no_playable_stream",
                ErrorKind::DecodeError => "decode",
                ErrorKind::MuxError => "mux",
                ErrorKind::ExportError => "export",
                ErrorKind::InvalidState => "invalid_state",
                ErrorKind::Environment => "environment",
            },
            WorkerError::Io(_) => "io",
            WorkerError::Json(_) => "json",
        }
    }

    /// Whether the job was stopped by shutdown rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(MediaError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_keep_their_classification() {
        let err = WorkerError::from(MediaError::QualityTooLow {
            height: 240,
            min_height: 360,
        });
        assert_eq!(err.label(), "quality_too_low");
        assert!(err.to_string().contains("240p"));

        let err = WorkerError::from(MediaError::MuxError("broken pipe".into()));
        assert_eq!(err.label(), "mux");
    }

    #[test]
    fn test_cancelled() {
        let err = WorkerError::from(MediaError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.label(), "cancelled");
        assert!(!WorkerError::JobTimeout(30).is_cancelled());
    }
}
