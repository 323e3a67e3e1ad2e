//! Batch executor.

use futures::future::join_all;
use metrics::{counter, histogram};
use reelcraft_media::MediaError;
use reelcraft_models::RenderJob;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn, Instrument};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::manifest::job_id;
use crate::processor::{JobOutcome, RenderProcessor};

/// Jobs by status (`success` / `failure` / `cancelled`).
pub const JOBS_TOTAL: &str = "reelcraft_jobs_total";
/// Wall-clock job time in seconds.
pub const JOB_DURATION_SECONDS: &str = "reelcraft_job_duration_seconds";

/// A job that did not produce a video.
#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub job_id: String,
    pub source: String,
    /// Short error class, see [`WorkerError::label`]
    pub kind: &'static str,
    pub error: String,
}

/// Outcome of a whole batch, in submission order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<JobOutcome>,
    pub failed: Vec<JobFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Renders independent jobs concurrently.
///
/// At most `max_concurrent_jobs` compositions run at once, each bounded by
/// the job timeout. A failing job is recorded and never stops the batch.
pub struct BatchExecutor {
    processor: Arc<RenderProcessor>,
    job_semaphore: Arc<Semaphore>,
    job_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BatchExecutor {
    pub fn new(
        processor: RenderProcessor,
        max_concurrent_jobs: usize,
        job_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            processor: Arc::new(processor),
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            job_timeout,
            shutdown,
        }
    }

    /// Run every job and report the results.
    pub async fn run(&self, jobs: Vec<RenderJob>) -> BatchSummary {
        info!(
            jobs = jobs.len(),
            max_concurrent = self.job_semaphore.available_permits(),
            "Starting batch"
        );

        let mut labels = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let id = job_id(&job);
            let processor = Arc::clone(&self.processor);
            let semaphore = Arc::clone(&self.job_semaphore);
            let shutdown = self.shutdown.clone();
            let timeout = self.job_timeout;
            let span = JobLogger::new(id.clone(), "render").create_span();

            labels.push((id.clone(), job.source.clone()));
            handles.push(tokio::spawn(
                async move { Self::execute_job(processor, semaphore, shutdown, timeout, &id, &job).await }
                    .instrument(span),
            ));
        }

        let mut summary = BatchSummary::default();
        for ((job_id, source), joined) in labels.into_iter().zip(join_all(handles).await) {
            let failure = match joined {
                Ok(Ok(outcome)) => {
                    summary.succeeded.push(outcome);
                    continue;
                }
                Ok(Err(e)) => (e.label(), e.to_string()),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Job task panicked");
                    ("panic", e.to_string())
                }
            };
            summary.failed.push(JobFailure {
                job_id,
                source,
                kind: failure.0,
                error: failure.1,
            });
        }

        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            "Batch finished"
        );
        summary
    }

    async fn execute_job(
        processor: Arc<RenderProcessor>,
        semaphore: Arc<Semaphore>,
        shutdown: watch::Receiver<bool>,
        timeout: Duration,
        job_id: &str,
        job: &RenderJob,
    ) -> WorkerResult<JobOutcome> {
        let _permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

        if *shutdown.borrow() {
            counter!(JOBS_TOTAL, "status" => "cancelled").increment(1);
            return Err(WorkerError::Media(MediaError::Cancelled));
        }

        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, processor.process(job_id, job)).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::JobTimeout(timeout.as_secs())),
        };
        let elapsed = started.elapsed().as_secs_f64();

        let status = match &result {
            Ok(_) => "success",
            Err(e) if e.is_cancelled() => "cancelled",
            Err(_) => "failure",
        };
        counter!(JOBS_TOTAL, "status" => status).increment(1);
        histogram!(JOB_DURATION_SECONDS, "status" => status).record(elapsed);

        if let Err(e) = &result {
            warn!(job_id, source = %job.source, kind = e.label(), error = %e, "Job failed");
        }
        result
    }
}
