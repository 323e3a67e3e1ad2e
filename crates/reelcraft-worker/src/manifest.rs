//! Render job manifests.

use reelcraft_models::encoding::OUTPUT_CONTAINER;
use reelcraft_models::RenderJob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};

/// Read and validate a JSON list of jobs.
pub async fn load_manifest(path: &Path) -> WorkerResult<Vec<RenderJob>> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        WorkerError::invalid_manifest(format!("cannot read {}: {e}", path.display()))
    })?;
    let jobs: Vec<RenderJob> = serde_json::from_slice(&raw)
        .map_err(|e| WorkerError::invalid_manifest(format!("{}: {e}", path.display())))?;
    validate_jobs(&jobs)?;
    Ok(jobs)
}

/// One default job per input, written under the input's file stem.
pub fn default_jobs(inputs: &[PathBuf]) -> Vec<RenderJob> {
    inputs
        .iter()
        .filter_map(|input| {
            let stem = input.file_stem()?.to_str()?;
            Some(RenderJob::new(
                input.to_string_lossy(),
                format!("{stem}.{OUTPUT_CONTAINER}"),
            ))
        })
        .collect()
}

/// Reject jobs that could never render or would overwrite each other.
pub fn validate_jobs(jobs: &[RenderJob]) -> WorkerResult<()> {
    let mut outputs = HashSet::new();

    for (i, job) in jobs.iter().enumerate() {
        if job.source.trim().is_empty() {
            return Err(WorkerError::invalid_manifest(format!("job {i}: source is empty")));
        }

        let extension = Path::new(&job.output)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if extension.as_deref() != Some(OUTPUT_CONTAINER) {
            return Err(WorkerError::invalid_manifest(format!(
                "job {i}: output {:?} must be an .{OUTPUT_CONTAINER} file",
                job.output
            )));
        }

        if !outputs.insert(job.output.as_str()) {
            return Err(WorkerError::invalid_manifest(format!(
                "job {i}: output {:?} is used by an earlier job",
                job.output
            )));
        }
    }

    Ok(())
}

/// The job's own id, or a fresh one.
pub fn job_id(job: &RenderJob) -> String {
    job.id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..12].to_string())
}
