//! Glob-based filesystem snapshots.
//!
//! A scan walks `root` once and returns every entry whose path relative to
//! `root` matches the pattern. The result is a snapshot: entries created
//! after the walk passes their directory are not seen, and callers never
//! rescan mid-stage.

use std::fs::FileType;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use recpost_common::error::{RecpostError, RecpostResult};

/// Which kinds of entries a scan returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Any,
}

impl EntryKind {
    fn accepts(self, file_type: FileType) -> bool {
        match self {
            EntryKind::File => file_type.is_file(),
            EntryKind::Dir => file_type.is_dir(),
            EntryKind::Any => true,
        }
    }
}

/// A compiled glob pattern bound to an entry kind.
#[derive(Debug, Clone)]
pub struct Scanner {
    pattern: String,
    matcher: GlobMatcher,
    kind: EntryKind,
    max_depth: Option<usize>,
}

impl Scanner {
    /// Compile `pattern`. `*` never crosses a path separator; `**` spans
    /// any number of directories.
    pub fn new(pattern: &str, kind: EntryKind) -> RecpostResult<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| RecpostError::Pattern {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?;

        // Without `**` a match can never be deeper than the pattern itself.
        let max_depth = if pattern.contains("**") {
            None
        } else {
            Some(pattern.split('/').filter(|c| !c.is_empty()).count())
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
            kind,
            max_depth,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a root-relative path matches the pattern.
    pub fn is_match(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }

    /// Walk `root` and collect matches as `root.join(relative)`, in
    /// traversal order with siblings sorted by name.
    pub fn scan(&self, root: &Path) -> RecpostResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(RecpostError::ScanRootMissing {
                path: root.to_path_buf(),
            });
        }

        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut matches = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(
                        root = %root.display(),
                        error = %err,
                        "Skipping unreadable entry during scan"
                    );
                    continue;
                }
            };

            if !self.kind.accepts(entry.file_type()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if self.is_match(relative) {
                matches.push(entry.into_path());
            }
        }

        tracing::debug!(
            root = %root.display(),
            pattern = %self.pattern,
            matches = matches.len(),
            "Scan complete"
        );
        Ok(matches)
    }
}

/// One-shot convenience wrapper around [`Scanner`].
pub fn scan(root: &Path, pattern: &str, kind: EntryKind) -> RecpostResult<Vec<PathBuf>> {
    Scanner::new(pattern, kind)?.scan(root)
}
