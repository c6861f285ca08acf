//! Shared file placement used by single-file, bulk and history operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::CommandHistory;
use super::coordinator::OperationCoordinator;
use crate::error::ExecutionError;
use crate::models::Destination;
use crate::ports::{ActivityLog, FileAccessGrantor, FileMover, PersistentStore};

/// Everything an execution step needs, cheap to clone
#[derive(Clone)]
pub struct ExecutionContext {
    pub coordinator: Arc<OperationCoordinator>,
    pub history: CommandHistory,
    pub mover: Arc<dyn FileMover>,
    pub grantor: Arc<dyn FileAccessGrantor>,
    pub store: Arc<dyn PersistentStore>,
    pub activity: Arc<dyn ActivityLog>,
}

/// Resolve a folder destination to the exact target path for `file_name`
pub fn resolve_target(
    grantor: &dyn FileAccessGrantor,
    destination: &Destination,
    file_name: &str,
) -> Result<PathBuf, ExecutionError> {
    let Destination::Folder {
        access_token,
        display_name,
    } = destination
    else {
        return Err(ExecutionError::MissingDestination(file_name.to_string()));
    };

    let grant = grantor.resolve(access_token).map_err(|e| {
        tracing::warn!(folder = %display_name, "[Execution] Grant unresolvable: {}", e);
        ExecutionError::StaleAccessGrant(display_name.clone())
    })?;
    if grant.is_stale {
        return Err(ExecutionError::StaleAccessGrant(display_name.clone()));
    }

    let granted_name = grant
        .location
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !granted_name.eq_ignore_ascii_case(display_name) {
        return Err(ExecutionError::WrongFolder {
            expected: display_name.clone(),
            granted: grant.location.display().to_string(),
        });
    }

    Ok(grant.location.join(file_name))
}

fn file_name_of(path: &Path) -> Result<String, ExecutionError> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ExecutionError::NotFound(path.display().to_string()))
}

/// Move a file into its destination, returning the new path.
///
/// Trash goes through the mover's recoverable holding area. Blocking.
pub fn place_file(
    mover: &dyn FileMover,
    grantor: &dyn FileAccessGrantor,
    from: &Path,
    destination: &Destination,
) -> Result<PathBuf, ExecutionError> {
    if destination.is_trash() {
        return mover.trash_item(from);
    }
    let target = resolve_target(grantor, destination, &file_name_of(from)?)?;
    mover.move_item(from, &target)?;
    Ok(target)
}

/// Copy a file into a folder destination, returning the copy's path. Blocking.
pub fn copy_file(
    mover: &dyn FileMover,
    grantor: &dyn FileAccessGrantor,
    from: &Path,
    destination: &Destination,
) -> Result<PathBuf, ExecutionError> {
    let target = resolve_target(grantor, destination, &file_name_of(from)?)?;
    mover.copy_item(from, &target)?;
    Ok(target)
}

/// Run a blocking filesystem step off the async runtime
pub async fn run_blocking<T, F>(f: F) -> Result<T, ExecutionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExecutionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExecutionError::Io(format!("Filesystem task failed: {}", e)))?
}
