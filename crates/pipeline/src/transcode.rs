//! Video transcoding through an external encoder.
//!
//! Every input gets its own encoder invocation and all of them run at once
//! (optionally capped by a semaphore). The stage waits for every invocation
//! to settle before returning.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::Semaphore;

use recpost_common::config::EncoderConfig;
use recpost_common::error::{RecpostError, RecpostResult};

use crate::report::{BatchReport, ItemOutcome};

/// Trait for encoder backends.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `input` into `output`, overwriting any existing file.
    async fn encode(&self, input: &Path, output: &Path) -> RecpostResult<()>;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Encoder backed by an ffmpeg-compatible command line:
/// `<program> -i <input> -vcodec <codec> -crf <crf> -y <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    config: EncoderConfig,
}

impl FfmpegEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Full argument list for one invocation.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.into(),
            "-vcodec".into(),
            self.config.video_codec.clone().into(),
            "-crf".into(),
            self.config.crf.to_string().into(),
            "-y".into(),
            output.into(),
        ]
    }

    fn timed_out(&self, secs: u64) -> RecpostError {
        RecpostError::Timeout {
            program: self.config.program.clone(),
            secs,
        }
    }

    /// Check that the encoder program can be started.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.config.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, input: &Path, output: &Path) -> RecpostResult<()> {
        let program = &self.config.program;
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %program, input = %input.display(), "Starting encoder");
        let child = cmd.spawn().map_err(|source| RecpostError::Spawn {
            program: program.clone(),
            source,
        })?;

        let wait = child.wait_with_output();
        let result = match self.config.timeout_secs {
            None => wait.await,
            // Dropping the timed-out future drops the child, which kills it.
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), wait).await {
                Ok(result) => result,
                Err(_) => return Err(self.timed_out(secs)),
            },
        };
        let finished = result.map_err(|source| RecpostError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(RecpostError::Subprocess {
                program: program.clone(),
                code: finished.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.program
    }
}

/// Runs the transcode stage over a snapshot of raw videos.
pub struct Transcoder<E> {
    encoder: E,
    output_dir: PathBuf,
    limit: Option<Arc<Semaphore>>,
}

impl<E: Encoder> Transcoder<E> {
    pub fn new(encoder: E, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            output_dir: output_dir.into(),
            limit: None,
        }
    }

    /// Cap the number of encoder processes running at once.
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.limit = max.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Transcode every input into `output_dir/<basename>`.
    ///
    /// Successful outputs are reported in input order; failed inputs keep
    /// their source file.
    pub async fn transcode_all(&self, inputs: &[PathBuf]) -> BatchReport<PathBuf> {
        if inputs.is_empty() {
            tracing::info!("No videos found to process");
            return BatchReport::empty();
        }

        tracing::info!(
            count = inputs.len(),
            encoder = self.encoder.name(),
            "Processing videos"
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            tracing::warn!(
                path = %self.output_dir.display(),
                error = %e,
                "Failed to create output directory"
            );
        }

        let jobs = plan_outputs(inputs, &self.output_dir)
            .into_iter()
            .map(|(input, output)| async move {
                let result = match output {
                    Ok(output) => self.transcode_one(&input, output).await,
                    Err(e) => {
                        tracing::error!(input = %input.display(), error = %e, "Skipping video");
                        Err(e)
                    }
                };
                ItemOutcome::new(input, result)
            });

        let report: BatchReport<PathBuf> = join_all(jobs).await.into_iter().collect();
        tracing::info!(processed = %report, "Video processing finished");
        report
    }

    async fn transcode_one(&self, input: &Path, output: PathBuf) -> RecpostResult<PathBuf> {
        let _permit = match &self.limit {
            Some(limit) => Some(
                limit
                    .acquire()
                    .await
                    .map_err(|e| anyhow::anyhow!("encoder slot unavailable: {e}"))?,
            ),
            None => None,
        };

        tracing::info!(input = %input.display(), "Processing video");
        match self.encoder.encode(input, &output).await {
            Ok(()) => {
                tracing::info!(output = %output.display(), "Processed video");
                match tokio::fs::remove_file(input).await {
                    Ok(()) => tracing::info!(path = %input.display(), "Deleted original"),
                    Err(e) => tracing::warn!(
                        path = %input.display(),
                        error = %e,
                        "Failed to delete original"
                    ),
                }
                Ok(output)
            }
            Err(e) => {
                tracing::error!(
                    input = %input.display(),
                    exit_code = ?e.exit_code(),
                    error = %e,
                    "Encoder failed"
                );
                Err(e)
            }
        }
    }
}

/// Pair each input with its flat output path.
///
/// A basename already claimed by an earlier input is rejected instead of
/// having two encoders write the same file, and so is an input that already
/// sits at its own output path, since the source is deleted after encoding.
fn plan_outputs(inputs: &[PathBuf], output_dir: &Path) -> Vec<(PathBuf, RecpostResult<PathBuf>)> {
    let mut claimed = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let output = match input.file_name() {
                Some(name) => {
                    let output = output_dir.join(name);
                    if output == *input {
                        Err(RecpostError::InPlaceOutput { path: output })
                    } else if claimed.insert(output.clone()) {
                        Ok(output)
                    } else {
                        Err(RecpostError::OutputCollision { path: output })
                    }
                }
                None => {
                    let message = format!("{} has no file name", input.display());
                    Err(RecpostError::config(message))
                }
            };
            (input.clone(), output)
        })
        .collect()
}
