pub mod check;
pub mod clean;
pub mod config;
pub mod purge;
pub mod run;
pub mod screenshots;
pub mod transcode;
pub mod upload;

use recpost_common::config::AppConfig;
use recpost_pipeline::upload::Credential;
use recpost_pipeline::{BatchReport, Pipeline};

/// Pipeline wired to the environment's upload token, if any.
pub(crate) fn pipeline(config: AppConfig) -> Pipeline<recpost_pipeline::transcode::FfmpegEncoder> {
    let credential = Credential::from_env(&config.upload.token_env);
    Pipeline::new(config, credential)
}

/// Print each failed item of a stage.
pub(crate) fn print_failures<T>(report: &BatchReport<T>) {
    for (path, error) in report.failures() {
        println!("  [FAIL] {}: {error}", path.display());
    }
}
