//! Batch render worker.
//!
//! This crate provides:
//! - The asset catalog over the input, processed, music and cookie directories
//! - Render job manifests and the per-job composition pipeline
//! - A bounded-concurrency batch executor with per-job timeouts
//! - The publisher seam and a dry-run implementation

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod manifest;
pub mod processor;
pub mod publisher;

pub use catalog::AssetCatalog;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{BatchExecutor, BatchSummary, JobFailure};
pub use logging::JobLogger;
pub use manifest::{default_jobs, load_manifest};
pub use processor::{JobOutcome, RenderProcessor};
pub use publisher::{DryRunPublisher, PublishReceipt, PublishRequest, Publisher};
