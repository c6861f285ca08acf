//! Error types for the organizer core
//!
//! Errors are grouped by who recovers from them:
//! - `CoordinationError` - duplicate or cancelled triggers, handled by the caller silently
//! - `ExecutionError` - per-file failures, collected and counted in batches
//! - `ModelError` - classifier failures, the gate falls back to "no suggestion"
//! - `StoreError` / `AccessError` / `ConfigError` - collaborator failures

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the operation coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    /// An operation for this file is already running
    #[error("An operation is already in progress for {0}")]
    AlreadyInProgress(String),

    /// The operation was cancelled before it could start
    #[error("Operation cancelled for {0}")]
    OperationCancelled(String),
}

/// Per-file execution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Folder access for '{0}' is stale and must be granted again")]
    StaleAccessGrant(String),

    #[error("Granted folder {granted} does not match expected destination '{expected}'")]
    WrongFolder { expected: String, granted: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not enough disk space to move {0}")]
    DiskFull(String),

    #[error("Refusing to operate on {kind}: {path}")]
    UnsafeFileType { path: String, kind: String },

    #[error("Path is outside of every granted folder: {0}")]
    OutsideGrantedRoot(String),

    #[error("Refusing to modify protected path: {0}")]
    ProtectedPath(String),

    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    #[error("No destination chosen for {0}")]
    MissingDestination(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ExecutionError {
    /// Classify an `io::Error` for the given path
    pub fn from_io(err: &std::io::Error, path: &std::path::Path) -> Self {
        let display = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ExecutionError::PermissionDenied(display),
            std::io::ErrorKind::NotFound => ExecutionError::NotFound(display),
            std::io::ErrorKind::AlreadyExists => ExecutionError::DestinationExists(display),
            // ENOSPC
            _ if err.raw_os_error() == Some(28) => ExecutionError::DiskFull(display),
            _ => ExecutionError::Io(format!("{}: {}", display, err)),
        }
    }
}

/// Failures resolving a folder access grant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Unknown access token: {0}")]
    UnknownToken(String),

    #[error("Failed to resolve access token {token}: {reason}")]
    Unresolvable { token: String, reason: String },
}

/// Classifier failures. Always recovered by the prediction gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("No model version is active")]
    NoActiveModel,

    #[error("Model version {0} is corrupt or unreadable")]
    Corrupt(String),

    #[error("Prediction timed out after {0}ms")]
    Timeout(u64),

    #[error("Training failed: {0}")]
    TrainingFailed(String),

    #[error("Unknown model version: {0}")]
    UnknownVersion(String),
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Invalid state transitions on an organized file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileStateError {
    #[error("File {0} cannot be ready without a destination")]
    ReadyWithoutDestination(String),

    #[error("File path must not be empty")]
    EmptyPath,
}

/// Top-level error for organizer entry points
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error("{file}: {source}")]
    Execution {
        file: String,
        #[source]
        source: ExecutionError,
    },

    #[error(transparent)]
    State(#[from] FileStateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Organizer is stopped")]
    Stopped,

    #[error("Task failed: {0}")]
    Task(String),
}

impl OrganizeError {
    /// Errors the caller should drop without telling the user
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            OrganizeError::Coordination(CoordinationError::AlreadyInProgress(_))
        )
    }

    /// Whether this is a cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            OrganizeError::Coordination(CoordinationError::OperationCancelled(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_io_error_classification() {
        let path = Path::new("/tmp/a.pdf");
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(
            ExecutionError::from_io(&denied, path),
            ExecutionError::PermissionDenied("/tmp/a.pdf".to_string())
        );

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(
            ExecutionError::from_io(&missing, path),
            ExecutionError::NotFound(_)
        ));

        let full = std::io::Error::from_raw_os_error(28);
        assert!(matches!(
            ExecutionError::from_io(&full, path),
            ExecutionError::DiskFull(_)
        ));
    }

    #[test]
    fn test_silent_and_cancellation() {
        let dup = OrganizeError::from(CoordinationError::AlreadyInProgress("a".into()));
        assert!(dup.is_silent());
        assert!(!dup.is_cancellation());

        let cancelled = OrganizeError::from(CoordinationError::OperationCancelled("a".into()));
        assert!(cancelled.is_cancellation());
        assert!(!cancelled.is_silent());
    }
}
