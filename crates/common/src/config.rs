//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecpostError, RecpostResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Filesystem layout the pipeline operates on.
    pub paths: PathsConfig,

    /// External encoder settings.
    pub encoder: EncoderConfig,

    /// Object store settings.
    pub upload: UploadSettings,

    /// Maximum number of concurrent per-file operations within a stage.
    /// `None` launches every file at once.
    pub max_concurrency: Option<usize>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Directory layout, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Flat output directory; transcoded videos land here.
    pub output_dir: PathBuf,

    /// Raw captures (screenshots and recordings), arbitrarily nested.
    pub screenshots_dir: PathBuf,

    /// Docs site static asset tree receiving screenshots.
    pub docs_screenshots_dir: PathBuf,

    /// Glob (relative to `output_dir`) naming stale capture folders.
    pub stale_folder_pattern: String,
}

/// Encoder invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder executable.
    pub program: String,

    /// Target video codec.
    pub video_codec: String,

    /// Constant rate factor.
    pub crf: u8,

    /// Kill the encoder and report a failure after this many seconds.
    pub timeout_secs: Option<u64>,
}

/// Object store settings. The credential itself is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSettings {
    /// Base URL of the blob API.
    pub base_url: String,

    /// Prefix prepended to every object key.
    pub key_prefix: String,

    /// Content type sent with every upload.
    pub content_type: String,

    /// Use the multipart protocol for files larger than one part.
    pub multipart: bool,

    /// Environment variable holding the write token.
    pub token_env: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "recpost=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from("output");
        Self {
            screenshots_dir: output_dir.join("screenshots"),
            output_dir,
            docs_screenshots_dir: PathBuf::from("../../apps/docs/public/screenshots"),
            stale_folder_pattern: "2025-*".to_string(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            crf: 23,
            timeout_secs: None,
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            base_url: "https://blob.vercel-storage.com".to_string(),
            key_prefix: "videos/".to_string(),
            content_type: "video/mp4".to_string(),
            multipart: true,
            token_env: "BLOB_READ_WRITE_TOKEN".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing fields take defaults.
    pub fn load_from(path: &Path) -> RecpostResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RecpostError::file_op("read", path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> RecpostResult<()> {
        if self.encoder.program.trim().is_empty() {
            return Err(RecpostError::config("encoder.program must not be empty"));
        }
        if self.upload.token_env.trim().is_empty() {
            return Err(RecpostError::config("upload.token_env must not be empty"));
        }
        if self.max_concurrency == Some(0) {
            return Err(RecpostError::config("max_concurrency must be at least 1"));
        }
        if self.encoder.timeout_secs == Some(0) {
            return Err(RecpostError::config("encoder.timeout_secs must be at least 1"));
        }
        // Transcoded files are written flat into output_dir and their
        // sources deleted, so the two trees must differ.
        if self.paths.screenshots_dir == self.paths.output_dir {
            return Err(RecpostError::config(
                "paths.screenshots_dir must differ from paths.output_dir",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("recpost").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_recording_layout() {
        let config = AppConfig::default();
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
        assert_eq!(
            config.paths.screenshots_dir,
            PathBuf::from("output/screenshots")
        );
        assert_eq!(config.paths.stale_folder_pattern, "2025-*");
        assert_eq!(config.encoder.video_codec, "libx264");
        assert_eq!(config.encoder.crf, 23);
        assert_eq!(config.upload.key_prefix, "videos/");
        assert_eq!(config.upload.token_env, "BLOB_READ_WRITE_TOKEN");
        assert!(config.max_concurrency.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"encoder": {"crf": 28}, "max_concurrency": 4}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.encoder.crf, 28);
        assert_eq!(config.encoder.program, "ffmpeg");
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_save_then_load_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.encoder.timeout_secs = Some(120);
        config.logging.json = true;

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = AppConfig {
            max_concurrency: Some(0),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecpostError::Config { .. })));
    }

    #[test]
    fn test_screenshots_dir_equal_to_output_dir_is_rejected() {
        let mut config = AppConfig::default();
        config.paths.screenshots_dir = PathBuf::from("output/");

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("screenshots_dir"), "{err}");
    }
}
