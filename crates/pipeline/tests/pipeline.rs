use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use recpost_common::config::{AppConfig, PathsConfig};
use recpost_common::error::{RecpostError, RecpostResult};
use recpost_pipeline::store::{ObjectStore, PutOptions, RemoteAsset};
use recpost_pipeline::transcode::Encoder;
use recpost_pipeline::upload::{Credential, UploadConfig};
use recpost_pipeline::{Pipeline, StageOutcome, StoreFactory, Tally};

/// Copies input to output unless the file name contains "broken".
#[derive(Default)]
struct CopyEncoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Encoder for CopyEncoder {
    async fn encode(&self, input: &Path, output: &Path) -> RecpostResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.to_string_lossy().contains("broken") {
            return Err(RecpostError::Subprocess {
                program: "copy".to_string(),
                code: Some(187),
                stderr: "corrupt stream".to_string(),
            });
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "copy"
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        path: &Path,
        _options: &PutOptions,
    ) -> RecpostResult<RemoteAsset> {
        let bytes = tokio::fs::read(path).await?;
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(RemoteAsset {
            key: key.to_string(),
            url: format!("https://blob.test/{key}"),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config: AppConfig,
}

impl Workspace {
    fn new() -> Self {
        recpost_common::logging::init_default_logging();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let output_dir = root.join("output");
        fs::create_dir_all(output_dir.join("screenshots")).unwrap();

        let config = AppConfig {
            paths: PathsConfig {
                screenshots_dir: output_dir.join("screenshots"),
                output_dir,
                docs_screenshots_dir: root.join("docs/public/screenshots"),
                stale_folder_pattern: "2025-*".to_string(),
            },
            ..AppConfig::default()
        };
        Self {
            _dir: dir,
            root,
            config,
        }
    }

    fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    fn pipeline(
        &self,
        credential: Option<Credential>,
        store: Arc<MemoryStore>,
        factory_calls: Arc<AtomicUsize>,
    ) -> Pipeline<CopyEncoder> {
        let factory: StoreFactory = Box::new(
            move |_config: &UploadConfig| -> RecpostResult<Arc<dyn ObjectStore>> {
                factory_calls.fetch_add(1, Ordering::SeqCst);
                Ok(store.clone())
            },
        );
        Pipeline::with_encoder(self.config.clone(), CopyEncoder::default(), credential)
            .with_store_factory(factory)
    }
}

fn completed(succeeded: usize, attempted: usize) -> StageOutcome {
    StageOutcome::Completed(Tally {
        succeeded,
        attempted,
    })
}

#[tokio::test]
async fn full_run_processes_every_stage_in_order() {
    let ws = Workspace::new();
    ws.write("output/2025-06-01_120000/commands.json", b"{}");
    ws.write("output/screenshots/ios/login.png", b"png-login");
    ws.write("output/screenshots/ios/onboarding.mp4", b"raw-video");
    let store = Arc::new(MemoryStore::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let credential = Some(Credential::new("token"));
    let summary = ws
        .pipeline(credential, store.clone(), calls.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.cleanup, completed(1, 1));
    assert_eq!(summary.transcode, completed(1, 1));
    assert_eq!(summary.upload, completed(1, 1));
    assert_eq!(summary.relocate, completed(1, 1));
    assert_eq!(summary.purge, completed(2, 2));
    assert_eq!(
        summary.assets,
        vec![RemoteAsset {
            key: "videos/onboarding.mp4".to_string(),
            url: "https://blob.test/videos/onboarding.mp4".to_string(),
        }]
    );

    assert!(!ws.root.join("output/2025-06-01_120000").exists());
    assert_eq!(
        fs::read(ws.root.join("docs/public/screenshots/ios/login.png")).unwrap(),
        b"png-login"
    );
    assert!(!ws.root.join("output/onboarding.mp4").exists());
    assert!(!ws.root.join("output/screenshots/ios/login.png").exists());
    assert_eq!(
        store.objects.lock().unwrap().get("videos/onboarding.mp4"),
        Some(&b"raw-video".to_vec())
    );
}

#[tokio::test]
async fn upload_is_skipped_without_transcoded_output() {
    let ws = Workspace::new();
    ws.write("output/screenshots/android/home.png", b"png");
    let calls = Arc::new(AtomicUsize::new(0));

    let summary = ws
        .pipeline(None, Arc::new(MemoryStore::default()), calls.clone())
        .run()
        .await
        .expect("missing credential is irrelevant when nothing is uploaded");

    assert_eq!(summary.transcode, completed(0, 0));
    assert_eq!(summary.upload, StageOutcome::Skipped);
    assert_eq!(summary.relocate, completed(1, 1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_credential_stops_before_any_upload() {
    let ws = Workspace::new();
    ws.write("output/screenshots/ios/signup.mp4", b"raw");
    let screenshot = ws.write("output/screenshots/ios/signup.png", b"png");
    let store = Arc::new(MemoryStore::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let err = ws
        .pipeline(None, store.clone(), calls.clone())
        .run()
        .await
        .unwrap_err();

    match err {
        RecpostError::MissingCredential { var } => assert_eq!(var, "BLOB_READ_WRITE_TOKEN"),
        other => panic!("expected a missing credential, got {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(store.objects.lock().unwrap().is_empty());
    // Later stages never ran.
    assert!(screenshot.exists());
    assert!(!ws.root.join("docs").exists());
}

#[tokio::test]
async fn failed_transcode_keeps_source_and_still_uploads_it() {
    let ws = Workspace::new();
    let good = ws.write("output/screenshots/a/first.mp4", b"1");
    let broken = ws.write("output/screenshots/b/broken.mp4", b"2");
    let third = ws.write("output/screenshots/c/third.mp4", b"3");
    let store = Arc::new(MemoryStore::default());

    let pipeline = ws.pipeline(
        Some(Credential::new("token")),
        store.clone(),
        Arc::new(AtomicUsize::new(0)),
    );
    let report = pipeline.transcode().await.unwrap();

    assert_eq!(report.to_string(), "2/3");
    assert!(!good.exists());
    assert!(broken.exists());
    assert!(!third.exists());
    assert_eq!(pipeline.encoder().calls.load(Ordering::SeqCst), 3);

    // The broader upload scan picks up the untranscoded source too.
    let uploaded = pipeline.upload().await.unwrap();
    assert_eq!(uploaded.to_string(), "3/3");
}

#[tokio::test]
async fn stage_failures_do_not_stop_the_run() {
    let ws = Workspace::new();
    ws.write("output/2025-01-01_000000/log.txt", b"log");
    ws.write("output/leftover.mp4", b"old");
    fs::remove_dir_all(ws.root.join("output/screenshots")).unwrap();

    let store = Arc::new(MemoryStore::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let summary = ws.pipeline(None, store, calls).run().await.unwrap();

    assert_eq!(summary.cleanup, completed(1, 1));
    assert!(matches!(summary.transcode, StageOutcome::Failed(_)));
    assert_eq!(summary.upload, StageOutcome::Skipped);
    assert!(matches!(summary.relocate, StageOutcome::Failed(_)));
    assert_eq!(summary.purge, completed(1, 1));
    assert!(!ws.root.join("output/leftover.mp4").exists());
}
