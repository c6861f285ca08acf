//! `FileMover` backed by the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use super::guard::PathGuard;
use super::io::{copy_no_clobber, ensure_regular_file, exists_no_follow, rename_or_copy, sync_directory, unique_path};
use crate::error::ExecutionError;
use crate::ports::FileMover;

/// Moves regular files between granted folders.
///
/// Deleted files go to a holding folder instead of being unlinked, so every
/// deletion can be undone.
#[derive(Debug)]
pub struct LocalFileMover {
    guard: PathGuard,
    trash_dir: PathBuf,
}

impl LocalFileMover {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>, trash_dir: impl Into<PathBuf>) -> Self {
        let trash_dir = trash_dir.into();
        if let Err(e) = fs::create_dir_all(&trash_dir) {
            tracing::warn!(dir = %trash_dir.display(), "[FileMover] Failed to create holding folder: {}", e);
        }
        let guard = PathGuard::new(roots);
        guard.allow_root(&trash_dir);
        Self { guard, trash_dir }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    fn check_pair(&self, from: &Path, to: &Path) -> Result<(), ExecutionError> {
        self.guard.check(from)?;
        self.guard.check(to)?;
        ensure_regular_file(from)?;
        if exists_no_follow(to) {
            return Err(ExecutionError::DestinationExists(to.display().to_string()));
        }
        Ok(())
    }

    fn sync_parent(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = sync_directory(parent) {
                tracing::debug!(dir = %parent.display(), "[FileMover] Directory sync failed: {}", e);
            }
        }
    }
}

impl FileMover for LocalFileMover {
    fn move_item(&self, from: &Path, to: &Path) -> Result<(), ExecutionError> {
        self.check_pair(from, to)?;
        rename_or_copy(from, to).map_err(|e| ExecutionError::from_io(&e, from))?;
        Self::sync_parent(to);
        tracing::debug!(from = %from.display(), to = %to.display(), "[FileMover] Moved");
        Ok(())
    }

    fn copy_item(&self, from: &Path, to: &Path) -> Result<(), ExecutionError> {
        self.check_pair(from, to)?;
        copy_no_clobber(from, to).map_err(|e| ExecutionError::from_io(&e, to))?;
        Self::sync_parent(to);
        Ok(())
    }

    fn remove_item(&self, path: &Path) -> Result<(), ExecutionError> {
        self.guard.check(path)?;
        ensure_regular_file(path)?;
        fs::remove_file(path).map_err(|e| ExecutionError::from_io(&e, path))
    }

    fn trash_item(&self, path: &Path) -> Result<PathBuf, ExecutionError> {
        self.guard.check(path)?;
        ensure_regular_file(path)?;

        fs::create_dir_all(&self.trash_dir).map_err(|e| ExecutionError::from_io(&e, &self.trash_dir))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ExecutionError::NotFound(path.display().to_string()))?;
        let target = unique_path(&self.trash_dir, &name);

        rename_or_copy(path, &target).map_err(|e| ExecutionError::from_io(&e, path))?;
        Self::sync_parent(&target);
        tracing::info!(from = %path.display(), to = %target.display(), "[FileMover] Moved to holding folder");
        Ok(target)
    }
}
