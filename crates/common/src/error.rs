//! Error types shared across recpost crates.

use std::path::PathBuf;

/// Top-level error type for recpost operations.
#[derive(Debug, thiserror::Error)]
pub enum RecpostError {
    #[error("Scan root does not exist: {path}")]
    ScanRootMissing { path: PathBuf },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("{program} exited with code {code:?}: {stderr}")]
    Subprocess {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("Failed to {operation} {path}: {source}")]
    FileOp {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output {path} is already claimed by another input in this batch")]
    OutputCollision { path: PathBuf },

    #[error("Output {path} would overwrite its own source")]
    InPlaceOutput { path: PathBuf },

    #[error("{var} environment variable is not set")]
    MissingCredential { var: String },

    #[error("Upload error: {message}")]
    Upload { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RecpostError.
pub type RecpostResult<T> = Result<T, RecpostError>;

impl RecpostError {
    pub fn file_op(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileOp {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn missing_credential(var: impl Into<String>) -> Self {
        Self::MissingCredential { var: var.into() }
    }

    /// Whether this error must stop the whole pipeline.
    ///
    /// Only a missing upload credential qualifies; everything else is
    /// contained at the item or stage boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }

    /// Exit code reported by a failed subprocess, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Subprocess { code, .. } => *code,
            _ => None,
        }
    }
}
