//! Stale capture folder removal and final output purge.
//!
//! Deletions are attempted one at a time and never roll back. A failure on
//! one path is logged and counted; the rest of the batch still runs.

use std::path::{Path, PathBuf};

use chrono::Datelike;

use recpost_common::error::RecpostError;

use crate::report::{BatchReport, ItemOutcome, Tally};
use crate::scanner::{EntryKind, Scanner};

/// Recursively delete each capture folder.
pub async fn remove_stale_folders(folders: &[PathBuf]) -> BatchReport<PathBuf> {
    if folders.is_empty() {
        tracing::info!("No stale capture folders to clean");
        return BatchReport::empty();
    }

    tracing::info!(count = folders.len(), "Cleaning stale capture folders");
    let mut report = BatchReport::empty();
    for folder in folders {
        let result = match tokio::fs::remove_dir_all(folder).await {
            Ok(()) => {
                tracing::info!(path = %folder.display(), "Removed capture folder");
                Ok(folder.clone())
            }
            Err(e) => {
                tracing::error!(
                    path = %folder.display(),
                    error = %e,
                    "Failed to remove capture folder"
                );
                Err(RecpostError::file_op("remove", folder, e))
            }
        };
        report.push(ItemOutcome::new(folder, result));
    }

    tracing::info!(removed = %report, "Stale folder cleanup finished");
    report
}

/// Delete individual files.
pub async fn remove_files(files: &[PathBuf]) -> BatchReport<PathBuf> {
    let mut report = BatchReport::empty();
    for file in files {
        let result = match tokio::fs::remove_file(file).await {
            Ok(()) => {
                tracing::debug!(path = %file.display(), "Removed file");
                Ok(file.clone())
            }
            Err(e) => {
                tracing::error!(path = %file.display(), error = %e, "Failed to remove file");
                Err(RecpostError::file_op("remove", file, e))
            }
        };
        report.push(ItemOutcome::new(file, result));
    }
    report
}

/// Delete every remaining `.mp4` and `.png` under `output_dir`.
///
/// Videos are snapshotted and removed before the images are scanned.
pub async fn purge_outputs(output_dir: &Path) -> Result<Tally, RecpostError> {
    tracing::info!(root = %output_dir.display(), "Cleaning up output files");

    let mut tally = Tally::default();
    for pattern in ["**/*.mp4", "**/*.png"] {
        let files = Scanner::new(pattern, EntryKind::File)?.scan(output_dir)?;
        tally = tally.combine(remove_files(&files).await.tally());
    }

    tracing::info!(removed = %tally, "Output cleanup finished");
    Ok(tally)
}

/// Warn when a stale-folder pattern is pinned to a calendar year that has
/// already passed; it will not match folders created this year.
pub fn check_year_literal(pattern: &str) -> Option<i32> {
    let leading: String = pattern
        .rsplit('/')
        .next()
        .unwrap_or(pattern)
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if leading.len() != 4 {
        return None;
    }

    let year: i32 = leading.parse().ok()?;
    let current = chrono::Local::now().year();
    if year < current {
        tracing::warn!(
            pattern,
            year,
            current,
            "Stale folder pattern is pinned to a past year and will miss newer capture folders"
        );
        return Some(year);
    }
    None
}
