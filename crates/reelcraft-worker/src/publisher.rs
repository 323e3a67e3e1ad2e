//! Handing finished renders to a publishing platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelcraft_models::{InteractionFlags, PublishSpec, Visibility};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Maximum caption length accepted by the platform.
pub const MAX_TITLE_CHARS: usize = 2200;

/// One video to publish as one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRequest {
    pub video: PathBuf,
    pub identity: String,
    /// Session cookie file of the identity
    pub cookie: PathBuf,
    pub title: String,
    pub visibility: Visibility,
    pub interactions: InteractionFlags,
}

impl PublishRequest {
    pub fn new(video: impl Into<PathBuf>, cookie: impl Into<PathBuf>, spec: &PublishSpec) -> Self {
        Self {
            video: video.into(),
            identity: spec.identity.clone(),
            cookie: cookie.into(),
            title: spec.title.clone(),
            visibility: spec.visibility,
            interactions: spec.interactions,
        }
    }
}

/// What a publish attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub identity: String,
    pub video: PathBuf,
    pub published_at: DateTime<Utc>,
    /// Nothing left the machine
    pub dry_run: bool,
}

/// Publishes a finished video. One attempt per call.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> WorkerResult<PublishReceipt>;
}

/// Validates and logs requests without contacting any platform.
#[derive(Debug, Clone, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, request: &PublishRequest) -> WorkerResult<PublishReceipt> {
        validate(request).await?;

        info!(
            identity = %request.identity,
            video = %request.video.display(),
            title = %request.title,
            visibility = ?request.visibility,
            comments = request.interactions.comments,
            duet = request.interactions.duet,
            stitch = request.interactions.stitch,
            "Dry run: would publish video"
        );

        Ok(PublishReceipt {
            identity: request.identity.clone(),
            video: request.video.clone(),
            published_at: Utc::now(),
            dry_run: true,
        })
    }
}

/// Checks shared by every publisher.
pub async fn validate(request: &PublishRequest) -> WorkerResult<()> {
    let title_chars = request.title.chars().count();
    if request.title.trim().is_empty() {
        return Err(WorkerError::publish_failed("title is empty"));
    }
    if title_chars > MAX_TITLE_CHARS {
        return Err(WorkerError::publish_failed(format!(
            "title is {title_chars} characters, limit is {MAX_TITLE_CHARS}"
        )));
    }

    let video = tokio::fs::metadata(&request.video).await.map_err(|e| {
        WorkerError::publish_failed(format!("cannot read {}: {e}", request.video.display()))
    })?;
    if !video.is_file() || video.len() == 0 {
        return Err(WorkerError::publish_failed(format!(
            "{} is not a non-empty file",
            request.video.display()
        )));
    }

    if !tokio::fs::try_exists(&request.cookie).await.unwrap_or(false) {
        return Err(WorkerError::publish_failed(format!(
            "no session cookie for identity {}",
            request.identity
        )));
    }

    Ok(())
}
