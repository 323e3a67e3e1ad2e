//! Batch execution against a recording media backend.

use async_trait::async_trait;
use reelcraft_media::{
    FfmpegCommand, MediaBackend, MediaError, MediaInfo, MediaResult, ResolverConfig, SourceResolver,
    WaitPolicy,
};
use reelcraft_models::{
    AudioChoice, AudioRequest, OverlayPlacement, OverlayRequest, PublishSpec, RenderJob,
    TextOverlaySpec, Visibility,
};
use reelcraft_worker::{
    AssetCatalog, BatchExecutor, DryRunPublisher, RenderProcessor, WorkerConfig,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

#[derive(Default)]
struct RecordingBackend {
    media: HashMap<String, MediaInfo>,
    encode_delay: Duration,
    commands: Mutex<Vec<FfmpegCommand>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingBackend {
    fn new() -> Self {
        let video = MediaInfo {
            duration: 10.0,
            width: 1280,
            height: 720,
            fps: 30.0,
            video_codec: Some("h264".into()),
            audio_codec: Some("aac".into()),
            ..Default::default()
        };
        let song = MediaInfo {
            duration: 4.0,
            audio_codec: Some("mp3".into()),
            ..Default::default()
        };
        let logo = MediaInfo {
            duration: 0.04,
            width: 100,
            height: 100,
            fps: 25.0,
            video_codec: Some("png".into()),
            ..Default::default()
        };

        let mut media = HashMap::new();
        for name in ["base.mp4", "other.mp4", "third.mp4", "fourth.mp4"] {
            media.insert(name.to_string(), video.clone());
        }
        media.insert("song.mp3".to_string(), song);
        media.insert("logo.png".to_string(), logo);

        Self {
            media,
            ..Default::default()
        }
    }

    fn with_encode_delay(mut self, delay: Duration) -> Self {
        self.encode_delay = delay;
        self
    }

    fn commands(&self) -> Vec<FfmpegCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaBackend for RecordingBackend {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.media
            .get(name.as_ref())
            .cloned()
            .ok_or_else(|| MediaError::FfprobeFailed {
                message: format!("cannot probe {}", path.display()),
                stderr: None,
            })
    }

    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.commands.lock().unwrap().push(cmd.clone());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.encode_delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        std::fs::write(cmd.output(), b"encoded")?;
        Ok(())
    }
}

struct Fixture {
    _root: TempDir,
    config: WorkerConfig,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let config = WorkerConfig::with_data_dir(root.path());
        for dir in config.directories() {
            std::fs::create_dir_all(dir).unwrap();
        }
        for name in ["base.mp4", "other.mp4", "third.mp4", "fourth.mp4", "logo.png"] {
            std::fs::write(config.input_dir.join(name), b"source").unwrap();
        }
        std::fs::write(config.music_dir.join("song.mp3"), b"music").unwrap();
        std::fs::write(config.cookies_dir.join("tiktok_session-alice.cookie"), b"cookie").unwrap();
        Self { _root: root, config }
    }

    fn input(&self, name: &str) -> String {
        self.config.input_dir.join(name).to_string_lossy().to_string()
    }

    fn processed(&self, name: &str) -> PathBuf {
        self.config.processed_dir.join(name)
    }

    fn executor(&self, backend: Arc<RecordingBackend>, max_jobs: usize, timeout: Duration) -> BatchExecutor {
        let (_tx, rx) = watch::channel(false);
        self.executor_with_shutdown(backend, max_jobs, timeout, rx)
    }

    fn executor_with_shutdown(
        &self,
        backend: Arc<RecordingBackend>,
        max_jobs: usize,
        timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> BatchExecutor {
        let resolver = SourceResolver::new(
            backend.clone(),
            ResolverConfig {
                visibility_wait: WaitPolicy::fixed(1, Duration::from_millis(5)),
                ..ResolverConfig::default()
            },
        );
        let processor = RenderProcessor::new(
            backend,
            resolver,
            AssetCatalog::from_config(&self.config),
            Arc::new(DryRunPublisher),
        );
        BatchExecutor::new(processor, max_jobs, timeout, shutdown)
    }
}

#[tokio::test]
async fn test_failed_job_does_not_stop_batch() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new());
    let executor = fx.executor(backend.clone(), 2, Duration::from_secs(30));

    let jobs = vec![
        RenderJob::new(fx.input("base.mp4"), "good.mp4"),
        RenderJob::new(fx.input("missing.mp4"), "bad.mp4"),
        RenderJob::new(fx.input("clip.mkv"), "worse.mp4"),
    ];
    let summary = executor.run(jobs).await;

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded.len(), 1);
    assert!(!summary.is_success());
    assert_eq!(summary.succeeded[0].report.path, fx.processed("good.mp4"));
    assert!(fx.processed("good.mp4").exists());

    let kinds: Vec<_> = summary.failed.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec!["source_unavailable", "invalid_format"]);
    assert!(!fx.processed("bad.mp4").exists());
}

#[tokio::test]
async fn test_relative_source_resolves_in_input_dir() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new());
    let executor = fx.executor(backend.clone(), 1, Duration::from_secs(30));

    // The process working directory has no base.mp4
    assert!(!Path::new("base.mp4").exists());

    let summary = executor
        .run(vec![
            RenderJob::new("base.mp4", "rel.mp4"),
            RenderJob::new("missing.mp4", "gone.mp4"),
        ])
        .await;

    assert_eq!(summary.succeeded.len(), 1, "{:?}", summary.failed);
    assert_eq!(summary.succeeded[0].source, "base.mp4");
    assert!(fx.processed("rel.mp4").exists());

    let cmd = backend.commands().pop().unwrap();
    assert_eq!(cmd.inputs()[0].path, fx.config.input_dir.join("base.mp4"));

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].kind, "source_unavailable");
    assert!(summary.failed[0].error.contains(&fx.input("missing.mp4")));
}

#[tokio::test]
async fn test_full_job_pipeline() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new());
    let executor = fx.executor(backend.clone(), 1, Duration::from_secs(30));

    let mut job = RenderJob::new(fx.input("base.mp4"), "full.mp4");
    job.id = Some("full".to_string());
    job.speed = Some(2.0);
    job.audio = Some(AudioRequest {
        source: AudioChoice::Random,
        volume: 0.5,
        start_offset: 0.0,
    });
    job.effects = vec!["grayscale".into(), "sparkles".into(), "brightness-1.2".into()];
    job.overlays = vec![
        OverlayRequest {
            path: "logo.png".into(),
            placement: OverlayPlacement::default().at(10, 10),
        },
        OverlayRequest {
            path: "absent.png".into(),
            placement: OverlayPlacement::default(),
        },
    ];
    job.text = Some(TextOverlaySpec::new("Hello"));
    job.publish = Some(PublishSpec {
        identity: "alice".into(),
        title: "Weekend".into(),
        visibility: Visibility::Public,
        interactions: Default::default(),
    });

    let summary = executor.run(vec![job]).await;
    assert!(summary.is_success(), "{:?}", summary.failed);

    let outcome = &summary.succeeded[0];
    assert_eq!(outcome.job_id, "full");
    assert!((outcome.report.duration - 5.0).abs() < 1e-9);
    assert!(outcome.report.has_audio);

    let receipt = outcome.published.as_ref().unwrap();
    assert!(receipt.dry_run);
    assert_eq!(receipt.identity, "alice");

    let cmd = backend.commands().pop().unwrap();
    let graph = cmd.filter_graph().unwrap();
    assert!(graph.contains("hue=s=0,colorchannelmixer=rr=1.2:gg=1.2:bb=1.2"));
    assert!(graph.contains("overlay=x=10:y=10"));
    assert_eq!(graph.matches("overlay=").count(), 1);
    assert!(graph.contains("volume=0.5[aout]"));
    assert!(graph.contains("drawtext=text=Hello"));
}

#[tokio::test]
async fn test_unknown_identity_fails_after_render() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new());
    let executor = fx.executor(backend, 1, Duration::from_secs(30));

    let mut job = RenderJob::new(fx.input("base.mp4"), "unpublished.mp4");
    job.publish = Some(PublishSpec {
        identity: "mallory".into(),
        title: "Nope".into(),
        visibility: Visibility::Private,
        interactions: Default::default(),
    });

    let summary = executor.run(vec![job]).await;
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].kind, "publish_failed");
    // The render itself is kept
    assert!(fx.processed("unpublished.mp4").exists());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new().with_encode_delay(Duration::from_millis(50)));
    let executor = fx.executor(backend.clone(), 2, Duration::from_secs(30));

    let jobs = ["base.mp4", "other.mp4", "third.mp4", "fourth.mp4"]
        .iter()
        .enumerate()
        .map(|(i, name)| RenderJob::new(fx.input(name), format!("out{i}.mp4")))
        .collect();
    let summary = executor.run(jobs).await;

    assert!(summary.is_success(), "{:?}", summary.failed);
    assert_eq!(summary.succeeded.len(), 4);
    assert!(backend.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(backend.commands().len(), 4);

    // Submission order is preserved
    let outputs: Vec<_> = summary
        .succeeded
        .iter()
        .map(|o| o.report.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(outputs, vec!["out0.mp4", "out1.mp4", "out2.mp4", "out3.mp4"]);
}

#[tokio::test]
async fn test_job_timeout() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new().with_encode_delay(Duration::from_secs(30)));
    let executor = fx.executor(backend, 1, Duration::from_millis(100));

    let summary = executor
        .run(vec![RenderJob::new(fx.input("base.mp4"), "slow.mp4")])
        .await;

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].kind, "timeout");
    assert!(!fx.processed("slow.mp4").exists());
    assert!(std::fs::read_dir(&fx.config.processed_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn test_shutdown_skips_pending_jobs() {
    let fx = Fixture::new();
    let backend = Arc::new(RecordingBackend::new());
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let executor = fx.executor_with_shutdown(backend.clone(), 1, Duration::from_secs(30), rx);

    let summary = executor
        .run(vec![
            RenderJob::new(fx.input("base.mp4"), "a.mp4"),
            RenderJob::new(fx.input("other.mp4"), "b.mp4"),
        ])
        .await;

    assert_eq!(summary.failed.len(), 2);
    assert!(summary.failed.iter().all(|f| f.kind == "cancelled"));
    assert!(backend.commands().is_empty());
}
