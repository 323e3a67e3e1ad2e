//! Batch render worker binary.
//!
//! Usage: `reelcraft-worker [manifest.json]`. Without a manifest argument or
//! `RENDER_MANIFEST`, every video in the input directory is rendered with
//! default settings.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use reelcraft_worker::logging::init_tracing;
use reelcraft_worker::{
    default_jobs, load_manifest, BatchExecutor, DryRunPublisher, RenderProcessor, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Worker failed: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether every job succeeded.
async fn run() -> anyhow::Result<bool> {
    info!("Starting reelcraft-worker");

    let mut config = WorkerConfig::from_env();
    if let Some(arg) = std::env::args_os().nth(1) {
        config.manifest = Some(PathBuf::from(arg));
    }
    info!("Worker config: {:?}", config);

    for dir in config.directories() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling running jobs");
            let _ = shutdown_tx.send(true);
        }
    });

    let processor = RenderProcessor::from_config(&config, Arc::new(DryRunPublisher), shutdown_rx.clone());

    let jobs = match &config.manifest {
        Some(path) => load_manifest(path).await?,
        None => {
            let inputs = processor.catalog().list_inputs().await?;
            info!(inputs = inputs.len(), dir = %config.input_dir.display(), "No manifest, rendering every input");
            default_jobs(&inputs)
        }
    };

    if jobs.is_empty() {
        warn!("Nothing to render");
        return Ok(true);
    }

    let executor = BatchExecutor::new(processor, config.max_concurrent_jobs, config.job_timeout, shutdown_rx);
    let summary = executor.run(jobs).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    for failure in &summary.failed {
        error!(job_id = %failure.job_id, source = %failure.source, kind = failure.kind, "{}", failure.error);
    }
    info!(total = summary.total(), failed = summary.failed.len(), "Worker finished");

    Ok(summary.is_success())
}
