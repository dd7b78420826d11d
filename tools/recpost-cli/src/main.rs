//! recpost CLI: post-processing for device recording runs.
//!
//! Usage:
//!   recpost run            Run every stage in order
//!   recpost clean          Remove stale capture folders
//!   recpost transcode      Re-encode raw videos into the output directory
//!   recpost upload         Upload every video in the output directory
//!   recpost screenshots    Copy screenshots into the docs asset tree
//!   recpost purge          Delete remaining videos and screenshots
//!   recpost check          Check encoder, credential, and directories
//!   recpost config         Show the effective configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use recpost_common::config::AppConfig;
use recpost_common::error::RecpostError;
use recpost_common::logging::{init_logging, with_bootstrap_logging, LogOverrides};

mod commands;

#[derive(Parser)]
#[command(
    name = "recpost",
    about = "Clean, transcode, publish, and relocate recording output",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Config file (defaults to $XDG_CONFIG_HOME/recpost/config.json)
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    /// Output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Raw capture directory
    #[arg(long, global = true)]
    screenshots_dir: Option<PathBuf>,

    /// Docs asset directory receiving screenshots
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    /// Glob (relative to the output directory) naming stale capture folders
    #[arg(long, global = true)]
    stale_pattern: Option<String>,

    /// Maximum concurrent encoder processes or uploads
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    /// Kill an encoder that runs longer than this many seconds
    #[arg(long, global = true)]
    encoder_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage: clean, transcode, upload, relocate, purge
    Run,

    /// Remove stale timestamped capture folders
    Clean,

    /// Transcode raw videos into the output directory
    Transcode,

    /// Upload every video in the output directory
    Upload,

    /// Copy screenshots into the docs asset tree
    Screenshots,

    /// Delete remaining videos and screenshots from the output directory
    Purge,

    /// Check encoder, credential, and directories
    Check,

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

impl ConfigOverrides {
    /// Load the configuration file and apply overrides.
    fn resolve(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config_file {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load(),
        };

        if let Some(dir) = &self.output_dir {
            // Keep the screenshots tree inside a relocated output directory.
            if self.screenshots_dir.is_none() {
                config.paths.screenshots_dir = dir.join("screenshots");
            }
            config.paths.output_dir = dir.clone();
        }
        if let Some(dir) = &self.screenshots_dir {
            config.paths.screenshots_dir = dir.clone();
        }
        if let Some(dir) = &self.docs_dir {
            config.paths.docs_screenshots_dir = dir.clone();
        }
        if let Some(pattern) = &self.stale_pattern {
            config.paths.stale_folder_pattern = pattern.clone();
        }
        if self.max_concurrency.is_some() {
            config.max_concurrency = self.max_concurrency;
        }
        if self.encoder_timeout.is_some() {
            config.encoder.timeout_secs = self.encoder_timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = with_bootstrap_logging(|| cli.overrides.resolve())?;

    config.logging = config.logging.with_overrides(LogOverrides {
        verbose: cli.verbose,
        json: cli.json_logs,
    });
    init_logging(&config.logging);
    tracing::debug!(overrides = ?cli.overrides, "Configuration resolved");

    let result = match cli.command {
        Commands::Run => commands::run::run(config).await,
        Commands::Clean => commands::clean::run(config).await,
        Commands::Transcode => commands::transcode::run(config).await,
        Commands::Upload => commands::upload::run(config).await,
        Commands::Screenshots => commands::screenshots::run(config).await,
        Commands::Purge => commands::purge::run(config).await,
        Commands::Check => commands::check::run(config).await,
        Commands::Config { save } => commands::config::run(config, cli.overrides.config_file, save),
    };

    if let Err(err) = &result {
        if let Some((code, message)) = remediation(err) {
            eprintln!("{message}");
            std::process::exit(code);
        }
    }
    result
}

/// Exit code and user-facing instructions for errors the user can fix.
fn remediation(err: &anyhow::Error) -> Option<(i32, String)> {
    match err.downcast_ref::<RecpostError>()? {
        RecpostError::MissingCredential { var } => {
            let message = format!(
                "Error: {var} environment variable is not set\n\n\
                 Set it by running: export {var}=your_token_here"
            );
            Some((1, message))
        }
        _ => None,
    }
}
