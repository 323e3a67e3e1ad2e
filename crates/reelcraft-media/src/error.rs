//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported container format: {0}")]
    InvalidFormat(String),

    #[error("Source not available after {attempts} checks: {path}")]
    SourceUnavailable { path: PathBuf, attempts: u32 },

    #[error("Adaptive streams not present after {attempts} checks: {missing:?}")]
    MergeTimeout { missing: Vec<PathBuf>, attempts: u32 },

    #[error("Best available video stream is {height}p, below the {min_height}p minimum")]
    QualityTooLow { height: u32, min_height: u32 },

    #[error("No playable stream for {0}")]
    NoPlayableStream(String),

    #[error("Cannot decode {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Mux failed: {0}")]
    MuxError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Flat classification of [`MediaError`] for callers that branch on the
/// failure class rather than the exact cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    InvalidFormat,
    SourceUnavailable,
    MergeTimeout,
    QualityTooLow,
    NoPlayableStream,
    DecodeError,
    MuxError,
    ExportError,
    InvalidState,
    /// Missing tools, IO, cancellation and other environment failures
    Environment,
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a decode error for a file.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::SourceUnavailable { .. } | Self::FileNotFound(_) => ErrorKind::SourceUnavailable,
            Self::MergeTimeout { .. } => ErrorKind::MergeTimeout,
            Self::QualityTooLow { .. } => ErrorKind::QualityTooLow,
            Self::NoPlayableStream(_) => ErrorKind::NoPlayableStream,
            Self::DecodeError { .. } | Self::FfprobeFailed { .. } | Self::JsonParse(_) => {
                ErrorKind::DecodeError
            }
            Self::MuxError(_) => ErrorKind::MuxError,
            Self::ExportError(_) => ErrorKind::ExportError,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::FfmpegNotFound
            | Self::FfprobeNotFound
            | Self::YtDlpNotFound
            | Self::FfmpegFailed { .. }
            | Self::DownloadFailed { .. }
            | Self::Cancelled
            | Self::Timeout(_)
            | Self::Io(_) => ErrorKind::Environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(MediaError::invalid_parameter("speed").kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            MediaError::QualityTooLow { height: 240, min_height: 360 }.kind(),
            ErrorKind::QualityTooLow
        );
        assert_eq!(MediaError::decode("a.mp4", "bad moov").kind(), ErrorKind::DecodeError);
        assert_eq!(MediaError::Cancelled.kind(), ErrorKind::Environment);
    }

    #[test]
    fn test_quality_message() {
        let err = MediaError::QualityTooLow { height: 240, min_height: 360 };
        assert_eq!(
            err.to_string(),
            "Best available video stream is 240p, below the 360p minimum"
        );
    }
}
