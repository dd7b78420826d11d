//! Screenshot relocation into the docs asset tree.

use std::path::{Path, PathBuf};

use recpost_common::error::{RecpostError, RecpostResult};

use crate::report::{BatchReport, ItemOutcome};

/// Copy each screenshot from `source_root` to the same relative path under
/// `dest_root`. Originals are left in place.
pub async fn relocate(
    files: &[PathBuf],
    source_root: &Path,
    dest_root: &Path,
) -> BatchReport<PathBuf> {
    if files.is_empty() {
        tracing::info!("No screenshots found to move");
        return BatchReport::empty();
    }

    tracing::info!(
        count = files.len(),
        dest = %dest_root.display(),
        "Moving screenshots to docs"
    );

    let mut report = BatchReport::empty();
    for file in files {
        let result = copy_preserving_layout(file, source_root, dest_root).await;
        match &result {
            Ok(target) => {
                tracing::info!(from = %file.display(), to = %target.display(), "Copied screenshot");
            }
            Err(e) => {
                tracing::error!(path = %file.display(), error = %e, "Failed to move screenshot");
            }
        }
        report.push(ItemOutcome::new(file, result));
    }

    tracing::info!(copied = %report, "Screenshot relocation finished");
    report
}

/// Destination for `file` under `dest_root`, keeping its layout relative
/// to `source_root`.
pub fn target_path(file: &Path, source_root: &Path, dest_root: &Path) -> RecpostResult<PathBuf> {
    let relative = file.strip_prefix(source_root).map_err(|_| {
        RecpostError::config(format!(
            "{} is not under {}",
            file.display(),
            source_root.display()
        ))
    })?;
    Ok(dest_root.join(relative))
}

async fn copy_preserving_layout(
    file: &Path,
    source_root: &Path,
    dest_root: &Path,
) -> RecpostResult<PathBuf> {
    let target = target_path(file, source_root, dest_root)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RecpostError::file_op("create directory", parent, e))?;
    }
    tokio::fs::copy(file, &target)
        .await
        .map_err(|e| RecpostError::file_op("copy", file, e))?;
    Ok(target)
}
