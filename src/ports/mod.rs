//! Collaborator interfaces consumed by the core.
//!
//! The core never touches disks, grants or storage directly; callers supply
//! these ports. Local implementations live in `fs`, `store` and the
//! submodules here.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AccessError, ExecutionError, StoreError};
use crate::models::OrganizedFile;
use crate::patterns::LearnedPattern;
use crate::prediction::TrainingRecord;
use crate::rules::Rule;

pub mod activity;
pub mod grant;

pub use activity::{ActivityEvent, ActivityRecord, MemoryActivityLog, TracingActivityLog};
pub use grant::BookmarkGrantor;

/// A folder grant resolved to a usable location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrant {
    pub location: PathBuf,
    /// The grant still resolves but must be renewed; callers must not hide this
    pub is_stale: bool,
}

/// Resolves opaque folder access tokens
pub trait FileAccessGrantor: Send + Sync {
    fn resolve(&self, token: &str) -> Result<ResolvedGrant, AccessError>;
}

/// Performs filesystem mutations.
///
/// Implementations must refuse symlinks, device nodes and FIFOs, and must not
/// touch anything outside the roots they were granted.
pub trait FileMover: Send + Sync {
    /// Move `from` to the exact path `to`
    fn move_item(&self, from: &Path, to: &Path) -> Result<(), ExecutionError>;

    /// Copy `from` to the exact path `to`
    fn copy_item(&self, from: &Path, to: &Path) -> Result<(), ExecutionError>;

    /// Remove a file this mover created (used to undo copies)
    fn remove_item(&self, path: &Path) -> Result<(), ExecutionError>;

    /// Move a file into the recoverable holding area, returning its new path
    fn trash_item(&self, path: &Path) -> Result<PathBuf, ExecutionError>;
}

/// Entity persistence
pub trait PersistentStore: Send + Sync {
    fn save_file(&self, file: &OrganizedFile) -> Result<(), StoreError>;

    fn fetch_files(
        &self,
        predicate: &dyn Fn(&OrganizedFile) -> bool,
    ) -> Result<Vec<OrganizedFile>, StoreError>;

    fn fetch_file(&self, id: &str) -> Result<Option<OrganizedFile>, StoreError> {
        Ok(self.fetch_files(&|f| f.id() == id)?.into_iter().next())
    }

    fn save_rule(&self, rule: &Rule) -> Result<(), StoreError>;

    fn delete_rule(&self, id: Uuid) -> Result<(), StoreError>;

    fn fetch_rules(&self) -> Result<Vec<Rule>, StoreError>;

    fn save_pattern(&self, pattern: &LearnedPattern) -> Result<(), StoreError>;

    fn fetch_patterns(&self) -> Result<Vec<LearnedPattern>, StoreError>;

    fn save_training_record(&self, record: &TrainingRecord) -> Result<(), StoreError>;

    fn fetch_training_records(&self) -> Result<Vec<TrainingRecord>, StoreError>;
}

/// Append-only audit sink
pub trait ActivityLog: Send + Sync {
    fn record(&self, event: ActivityEvent);
}
