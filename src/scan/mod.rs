//! Discovery of candidate files in a watched location.
//!
//! Produces `Pending` files for the decision pipeline. Symlinks are never
//! followed and hidden entries are skipped along with everything below them.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::error::ExecutionError;
use crate::models::{FileView, OrganizedFile};
use crate::ports::{ActivityEvent, ActivityLog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// `None` walks the whole tree; `Some(1)` only the root's direct children
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(1),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub files: Vec<OrganizedFile>,
    /// Symlinks, special files and unreadable entries that were passed over
    pub skipped: usize,
    pub total_size: u64,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Walk `root` and collect regular files tagged with `source_location`. Blocking.
pub fn scan_directory(
    root: &Path,
    source_location: &str,
    options: &ScanOptions,
    activity: &dyn ActivityLog,
) -> Result<ScanReport, ExecutionError> {
    let metadata = std::fs::metadata(root).map_err(|e| ExecutionError::from_io(&e, root))?;
    if !metadata.is_dir() {
        return Err(ExecutionError::NotFound(root.display().to_string()));
    }

    let mut walker = WalkDir::new(root).follow_links(false).min_depth(1);
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut report = ScanReport::default();
    let include_hidden = options.include_hidden;
    for entry in walker
        .into_iter()
        .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[Scan] Skipping unreadable entry: {}", e);
                report.skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            report.skipped += 1;
            continue;
        }

        match OrganizedFile::from_path(entry.path(), source_location) {
            Ok(file) => {
                report.total_size += file.size();
                report.files.push(file);
            }
            Err(e) => {
                tracing::debug!(path = %entry.path().display(), "[Scan] Failed to read metadata: {}", e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        files = report.files.len(),
        skipped = report.skipped,
        "[Scan] Complete"
    );
    activity.record(ActivityEvent::Scanned {
        root: root.display().to_string(),
        file_count: report.files.len(),
    });
    Ok(report)
}
