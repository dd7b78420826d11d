//! Stage-by-stage pipeline driver.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use recpost_common::config::AppConfig;
use recpost_common::error::{RecpostError, RecpostResult};

use crate::cleanup::{check_year_literal, purge_outputs, remove_stale_folders};
use crate::relocate::relocate;
use crate::report::{BatchReport, Tally};
use crate::scanner::{EntryKind, Scanner};
use crate::store::{BlobStore, ObjectStore, RemoteAsset};
use crate::transcode::{Encoder, FfmpegEncoder, Transcoder};
use crate::upload::{Credential, UploadConfig, Uploader};

/// Builds the object store once the upload configuration is validated.
pub type StoreFactory =
    Box<dyn Fn(&UploadConfig) -> RecpostResult<Arc<dyn ObjectStore>> + Send + Sync>;

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(Tally),
    Skipped,
    Failed(String),
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Completed(tally) => write!(f, "{tally} succeeded"),
            StageOutcome::Skipped => f.write_str("skipped"),
            StageOutcome::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// Per-stage results of a full run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub cleanup: StageOutcome,
    pub transcode: StageOutcome,
    pub upload: StageOutcome,
    pub relocate: StageOutcome,
    pub purge: StageOutcome,

    /// Objects uploaded during this run.
    pub assets: Vec<RemoteAsset>,
}

impl PipelineSummary {
    pub fn stages(&self) -> [(&'static str, &StageOutcome); 5] {
        [
            ("cleanup", &self.cleanup),
            ("transcode", &self.transcode),
            ("upload", &self.upload),
            ("relocate", &self.relocate),
            ("purge", &self.purge),
        ]
    }
}

/// The recording post-processing pipeline.
pub struct Pipeline<E> {
    config: AppConfig,
    transcoder: Transcoder<E>,
    credential: Option<Credential>,
    store_factory: StoreFactory,
}

impl Pipeline<FfmpegEncoder> {
    /// Pipeline using the configured ffmpeg encoder and the blob store.
    pub fn new(config: AppConfig, credential: Option<Credential>) -> Self {
        let encoder = FfmpegEncoder::new(config.encoder.clone());
        Self::with_encoder(config, encoder, credential)
    }
}

impl<E: Encoder> Pipeline<E> {
    pub fn with_encoder(config: AppConfig, encoder: E, credential: Option<Credential>) -> Self {
        let transcoder = Transcoder::new(encoder, config.paths.output_dir.clone())
            .with_max_concurrency(config.max_concurrency);
        Self {
            config,
            transcoder,
            credential,
            store_factory: Box::new(blob_store),
        }
    }

    /// Replace the object store backend.
    pub fn with_store_factory(mut self, factory: StoreFactory) -> Self {
        self.store_factory = factory;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        self.transcoder.encoder()
    }

    /// Run every stage in order.
    ///
    /// Stage failures are logged and the run moves on. The only error
    /// returned is a missing upload credential, and only when there is
    /// something to upload.
    pub async fn run(&self) -> RecpostResult<PipelineSummary> {
        tracing::info!("Starting post-processing");

        let cleanup = settle("cleanup", self.clean_stale().await.map(|r| r.tally()));

        let transcoded = self.transcode().await;
        let produced = transcoded.as_ref().map_or(0, |r| r.succeeded());
        let transcode = settle("transcode", transcoded.map(|r| r.tally()));

        let mut assets = Vec::new();
        let upload = if produced == 0 {
            tracing::info!("Nothing was transcoded; skipping upload");
            StageOutcome::Skipped
        } else {
            match self.upload().await {
                Err(e) if e.is_fatal() => return Err(e),
                Ok(report) => {
                    let tally = report.tally();
                    assets = report.into_successes();
                    StageOutcome::Completed(tally)
                }
                Err(e) => settle("upload", Err(e)),
            }
        };

        let relocate = settle(
            "relocate",
            self.relocate_screenshots().await.map(|r| r.tally()),
        );
        let purge = settle("purge", self.purge().await);

        tracing::info!("Post-processing complete");
        Ok(PipelineSummary {
            cleanup,
            transcode,
            upload,
            relocate,
            purge,
            assets,
        })
    }

    /// Remove stale capture folders under the output directory.
    pub async fn clean_stale(&self) -> RecpostResult<BatchReport<PathBuf>> {
        let scanner = Scanner::new(&self.config.paths.stale_folder_pattern, EntryKind::Dir)?;
        check_year_literal(scanner.pattern());
        let folders = scanner.scan(&self.config.paths.output_dir)?;
        Ok(remove_stale_folders(&folders).await)
    }

    /// Transcode every raw video under the screenshots tree.
    pub async fn transcode(&self) -> RecpostResult<BatchReport<PathBuf>> {
        let videos =
            Scanner::new("**/*.mp4", EntryKind::File)?.scan(&self.config.paths.screenshots_dir)?;
        Ok(self.transcoder.transcode_all(&videos).await)
    }

    /// Upload every `.mp4` under the output directory.
    ///
    /// The credential is checked before anything is scanned or sent.
    pub async fn upload(&self) -> RecpostResult<BatchReport<RemoteAsset>> {
        let settings = self.config.upload.clone();
        let upload_config = UploadConfig::new(settings, self.credential.clone())?;
        let store = (self.store_factory)(&upload_config)?;
        let uploader =
            Uploader::new(&upload_config, store).with_max_concurrency(self.config.max_concurrency);

        let videos =
            Scanner::new("**/*.mp4", EntryKind::File)?.scan(&self.config.paths.output_dir)?;
        Ok(uploader.upload_all(&videos).await)
    }

    /// Copy screenshots into the docs asset tree.
    pub async fn relocate_screenshots(&self) -> RecpostResult<BatchReport<PathBuf>> {
        let paths = &self.config.paths;
        let shots = Scanner::new("**/*.png", EntryKind::File)?.scan(&paths.screenshots_dir)?;
        Ok(relocate(&shots, &paths.screenshots_dir, &paths.docs_screenshots_dir).await)
    }

    /// Delete remaining videos and screenshots from the output directory.
    pub async fn purge(&self) -> RecpostResult<Tally> {
        purge_outputs(&self.config.paths.output_dir).await
    }
}

fn blob_store(config: &UploadConfig) -> RecpostResult<Arc<dyn ObjectStore>> {
    Ok(Arc::new(BlobStore::new(config)?))
}

fn settle(stage: &'static str, result: Result<Tally, RecpostError>) -> StageOutcome {
    match result {
        Ok(tally) => StageOutcome::Completed(tally),
        Err(e) => {
            tracing::error!(stage, error = %e, "Stage failed; continuing");
            StageOutcome::Failed(e.to_string())
        }
    }
}
