//! Concurrent, fault-isolated uploads of processed videos.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use recpost_common::config::UploadSettings;
use recpost_common::error::{RecpostError, RecpostResult};

use crate::report::{BatchReport, ItemOutcome};
use crate::store::{ObjectStore, PutOptions, RemoteAsset};

/// Write token for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from `var`. Unset and blank values are both absent.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Validated upload configuration. Cannot exist without a credential.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    settings: UploadSettings,
    credential: Credential,
}

impl UploadConfig {
    /// Fails with [`RecpostError::MissingCredential`] when no token is given.
    pub fn new(settings: UploadSettings, credential: Option<Credential>) -> RecpostResult<Self> {
        let credential = credential
            .filter(|c| !c.expose().trim().is_empty())
            .ok_or_else(|| RecpostError::missing_credential(&settings.token_env))?;
        Ok(Self {
            settings,
            credential,
        })
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            content_type: self.settings.content_type.clone(),
            add_random_suffix: false,
            multipart: self.settings.multipart,
        }
    }
}

/// Object key for a local file: prefix plus basename, nothing random.
pub fn object_key(prefix: &str, path: &Path) -> RecpostResult<String> {
    let name = path
        .file_name()
        .ok_or_else(|| RecpostError::upload(format!("{} has no file name", path.display())))?;
    Ok(format!("{prefix}{}", name.to_string_lossy()))
}

/// Runs the upload stage.
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    options: PutOptions,
    limit: Option<Arc<Semaphore>>,
}

impl Uploader {
    pub fn new(config: &UploadConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key_prefix: config.settings().key_prefix.clone(),
            options: config.put_options(),
            limit: None,
        }
    }

    /// Cap the number of uploads in flight.
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.limit = max.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Upload every file concurrently and wait for all of them to settle.
    pub async fn upload_all(&self, files: &[PathBuf]) -> BatchReport<RemoteAsset> {
        if files.is_empty() {
            tracing::info!("No .mp4 files found to upload");
            return BatchReport::empty();
        }

        tracing::info!(
            count = files.len(),
            store = self.store.name(),
            "Uploading videos"
        );

        let jobs = files.iter().map(|file| async move {
            ItemOutcome::new(file.clone(), self.upload_one(file).await)
        });
        let report: BatchReport<RemoteAsset> = join_all(jobs).await.into_iter().collect();

        tracing::info!(uploaded = %report, "Upload complete");
        report
    }

    async fn upload_one(&self, file: &Path) -> RecpostResult<RemoteAsset> {
        let _permit = match &self.limit {
            Some(limit) => Some(
                limit
                    .acquire()
                    .await
                    .map_err(|e| anyhow::anyhow!("upload slot unavailable: {e}"))?,
            ),
            None => None,
        };

        let key = object_key(&self.key_prefix, file)?;
        tracing::info!(file = %file.display(), key = %key, "Uploading");
        match self.store.put(&key, file, &self.options).await {
            Ok(asset) => {
                tracing::info!(key = %asset.key, url = %asset.url, "Uploaded");
                Ok(asset)
            }
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "Failed to upload");
                Err(e)
            }
        }
    }
}
