//! The organizer service: single-file operations, bulk runs and history.
//!
//! Every mutation registers with the coordinator first, runs filesystem work
//! on the blocking pool, persists the file, then records a command. Undo and
//! redo load the current file state by id, preferring the in-memory skip
//! working set over the store.
//!
//! Reversing a skip only touches the working set. Restored files reach the
//! store through `flush_pending` or when the organizer stops.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::apply::{copy_file, place_file, run_blocking, ExecutionContext};
use super::bulk::{BulkExecutor, BulkOutcome, ProgressCallback};
use super::commands::{Command, CommandStack, FileDelta};
use super::coordinator::{CancelToken, OperationCoordinator};
use crate::config::OrganizerConfig;
use crate::error::{ExecutionError, OrganizeError, StoreError};
use crate::models::{FileStatus, FileView, OrganizedFile};
use crate::ports::{ActivityEvent, ActivityLog, FileAccessGrantor, FileMover, PersistentStore};
use crate::rules::RuleAction;

/// Result of an undo or redo
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryOutcome {
    pub description: String,
    /// Files as they are after the step
    pub files: Vec<OrganizedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// A skipped file kept in memory so skip reversal needs no store round trip
#[derive(Debug, Clone)]
struct SkipEntry {
    file: OrganizedFile,
    /// Changed since it was last written to the store
    dirty: bool,
}

pub struct Organizer {
    config: OrganizerConfig,
    ctx: ExecutionContext,
    running: AtomicBool,
    skipped: Mutex<HashMap<String, SkipEntry>>,
}

impl Organizer {
    /// Build a stopped organizer; call `start` before use
    pub fn new(
        config: OrganizerConfig,
        mover: Arc<dyn FileMover>,
        grantor: Arc<dyn FileAccessGrantor>,
        store: Arc<dyn PersistentStore>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        let history = CommandStack::new(config.history.max_undo, config.history.max_redo);
        Self {
            ctx: ExecutionContext {
                coordinator: Arc::new(OperationCoordinator::new()),
                history: Arc::new(Mutex::new(history)),
                mover,
                grantor,
                store,
                activity,
            },
            config,
            running: AtomicBool::new(false),
            skipped: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn coordinator(&self) -> &OperationCoordinator {
        &self.ctx.coordinator
    }

    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("[Organizer] Started");
        }
    }

    /// Refuse new work and cancel everything in flight
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let cancelled = self.ctx.coordinator.cancel_all_operations();
            if let Err(e) = self.flush_pending() {
                tracing::warn!("[Organizer] Failed to persist restored files: {}", e);
            }
            tracing::info!(cancelled, "[Organizer] Stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), OrganizeError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(OrganizeError::Stopped)
        }
    }

    fn history(&self) -> MutexGuard<'_, CommandStack> {
        match self.ctx.history.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn skip_cache(&self) -> MutexGuard<'_, HashMap<String, SkipEntry>> {
        match self.skipped.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// A newer state for this file was written to the store
    fn forget_skipped(&self, file_id: &str) {
        self.skip_cache().remove(file_id);
    }

    /// Write skip reversals that so far exist only in memory.
    ///
    /// Returns how many files were written.
    pub fn flush_pending(&self) -> Result<usize, OrganizeError> {
        let dirty: Vec<OrganizedFile> = self
            .skip_cache()
            .values()
            .filter(|entry| entry.dirty)
            .map(|entry| entry.file.clone())
            .collect();

        for file in &dirty {
            self.ctx.store.save_file(file)?;
            if let Some(entry) = self.skip_cache().get_mut(file.id()) {
                if entry.file == *file {
                    entry.dirty = false;
                }
            }
        }
        if !dirty.is_empty() {
            tracing::debug!(count = dirty.len(), "[Organizer] Persisted restored files");
        }
        Ok(dirty.len())
    }

    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    /// Request cancellation of an in-flight operation
    pub fn cancel(&self, file_id: &str) -> bool {
        self.ctx.coordinator.cancel_operation(file_id)
    }

    /// Log and record a per-file failure
    fn failure(&self, file_name: &str, error: ExecutionError) -> OrganizeError {
        tracing::warn!(file = file_name, "[Organizer] {}", error);
        self.ctx.activity.record(ActivityEvent::OrganizeFailed {
            file_name: file_name.to_string(),
            error: error.to_string(),
        });
        OrganizeError::Execution {
            file: file_name.to_string(),
            source: error,
        }
    }

    /// Run the action a rule chose for this file
    pub async fn execute(&self, file: &mut OrganizedFile, action: RuleAction) -> Result<(), OrganizeError> {
        match action {
            RuleAction::Move | RuleAction::Delete => self.organize_file(file).await,
            RuleAction::Copy => self.copy_file(file).await,
        }
    }

    /// Move a file to its destination (or the holding folder for trash)
    pub async fn organize_file(&self, file: &mut OrganizedFile) -> Result<(), OrganizeError> {
        self.ensure_running()?;
        let guard = self.ctx.coordinator.begin_operation(file.id())?;

        let destination = match file.destination().cloned() {
            Some(d) => d,
            None => {
                return Err(self.failure(
                    file.name(),
                    ExecutionError::MissingDestination(file.name().to_string()),
                ))
            }
        };
        guard.checkpoint()?;

        let mover = Arc::clone(&self.ctx.mover);
        let grantor = Arc::clone(&self.ctx.grantor);
        let from = file.path().to_path_buf();
        let target = destination.clone();
        let to_path = run_blocking(move || place_file(mover.as_ref(), grantor.as_ref(), &from, &target))
            .await
            .map_err(|e| self.failure(file.name(), e))?;

        if guard.is_cancelled() {
            tracing::debug!(file = file.name(), "[Organizer] Cancelled after the move completed, keeping it");
        }

        let delta = FileDelta {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            from_path: file.path().to_path_buf(),
            to_path: to_path.clone(),
            original_status: file.status(),
            original_destination: Some(destination.clone()),
            destination: destination.clone(),
        };
        file.set_path(&to_path)?;
        file.set_status(FileStatus::Completed)?;
        self.history().push(Command::Move(delta));
        self.ctx.store.save_file(file)?;
        self.forget_skipped(file.id());

        tracing::info!(
            file = file.name(),
            destination = destination.display_name(),
            "[Organizer] Organized"
        );
        self.ctx.activity.record(ActivityEvent::FileOrganized {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            destination: destination.display_name().to_string(),
        });
        Ok(())
    }

    /// Copy a file into its destination, leaving the original in place
    pub async fn copy_file(&self, file: &mut OrganizedFile) -> Result<(), OrganizeError> {
        self.ensure_running()?;
        let guard = self.ctx.coordinator.begin_operation(file.id())?;

        let destination = match file.destination().cloned() {
            Some(d) => d,
            None => {
                return Err(self.failure(
                    file.name(),
                    ExecutionError::MissingDestination(file.name().to_string()),
                ))
            }
        };
        guard.checkpoint()?;

        let mover = Arc::clone(&self.ctx.mover);
        let grantor = Arc::clone(&self.ctx.grantor);
        let from = file.path().to_path_buf();
        let target = destination.clone();
        let copy_path = run_blocking(move || copy_file(mover.as_ref(), grantor.as_ref(), &from, &target))
            .await
            .map_err(|e| self.failure(file.name(), e))?;

        let delta = FileDelta {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            from_path: file.path().to_path_buf(),
            to_path: copy_path,
            original_status: file.status(),
            original_destination: Some(destination.clone()),
            destination: destination.clone(),
        };
        file.set_status(FileStatus::Completed)?;
        self.history().push(Command::Copy(delta));
        self.ctx.store.save_file(file)?;
        self.forget_skipped(file.id());

        self.ctx.activity.record(ActivityEvent::FileOrganized {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            destination: destination.display_name().to_string(),
        });
        Ok(())
    }

    /// Mark a file skipped. No disk work.
    pub fn skip_file(&self, file: &mut OrganizedFile) -> Result<(), OrganizeError> {
        self.ensure_running()?;
        let _guard = self.ctx.coordinator.begin_operation(file.id())?;

        let command = Command::Skip {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            previous_status: file.status(),
            previous_destination: file.destination().cloned(),
        };
        file.set_status(FileStatus::Skipped)?;
        self.history().push(command);
        self.ctx.store.save_file(file)?;
        {
            let history = self.history();
            let mut cache = self.skip_cache();
            cache.insert(
                file.id().to_string(),
                SkipEntry {
                    file: file.clone(),
                    dirty: false,
                },
            );
            cache.retain(|id, entry| entry.dirty || history.references(id));
        }

        self.ctx.activity.record(ActivityEvent::FileSkipped {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
        });
        Ok(())
    }

    /// Organize many files sequentially; see `BulkExecutor`
    pub async fn organize_batch(
        &self,
        files: &mut [OrganizedFile],
        cancel: &CancelToken,
        progress: Option<&ProgressCallback>,
    ) -> Result<BulkOutcome, OrganizeError> {
        self.ensure_running()?;
        let outcome = BulkExecutor::new(self.ctx.clone())
            .execute(files, cancel, progress)
            .await;
        for file in files.iter() {
            self.forget_skipped(file.id());
        }
        Ok(outcome)
    }

    /// Reverse the most recent command. `Ok(None)` when there is nothing to undo.
    pub async fn undo(&self) -> Result<Option<HistoryOutcome>, OrganizeError> {
        self.replay(Direction::Undo).await
    }

    /// Re-apply the most recently undone command
    pub async fn redo(&self) -> Result<Option<HistoryOutcome>, OrganizeError> {
        self.replay(Direction::Redo).await
    }

    /// A step succeeded: the command moves to the opposite stack
    fn finish(&self, direction: Direction, command: Command) {
        let mut history = self.history();
        match direction {
            Direction::Undo => history.push_redo(command),
            Direction::Redo => history.push_undo(command),
        }
    }

    /// A step failed: the command returns to the stack it came from
    fn give_back(&self, direction: Direction, command: Command) {
        let mut history = self.history();
        match direction {
            Direction::Undo => history.push_undo(command),
            Direction::Redo => history.push_redo(command),
        }
    }

    async fn replay(&self, direction: Direction) -> Result<Option<HistoryOutcome>, OrganizeError> {
        self.ensure_running()?;

        let popped = {
            let mut history = self.history();
            match direction {
                Direction::Undo => history.pop_undo(),
                Direction::Redo => history.pop_redo(),
            }
        };
        let Some(command) = popped else {
            return Ok(None);
        };
        let description = command.description();

        let files = match command {
            Command::Move(delta) => match self.step_delta(&delta, false, direction).await {
                Ok(file) => {
                    self.finish(direction, Command::Move(delta));
                    vec![file]
                }
                Err(e) => {
                    self.give_back(direction, Command::Move(delta));
                    return Err(e);
                }
            },
            Command::Copy(delta) => match self.step_delta(&delta, true, direction).await {
                Ok(file) => {
                    self.finish(direction, Command::Copy(delta));
                    vec![file]
                }
                Err(e) => {
                    self.give_back(direction, Command::Copy(delta));
                    return Err(e);
                }
            },
            Command::Skip {
                file_id,
                file_name,
                previous_status,
                previous_destination,
            } => {
                let result = self.step_skip(&file_id, previous_status, previous_destination.clone(), direction);
                let command = Command::Skip {
                    file_id,
                    file_name,
                    previous_status,
                    previous_destination,
                };
                match result {
                    Ok(file) => {
                        self.finish(direction, command);
                        vec![file]
                    }
                    Err(e) => {
                        self.give_back(direction, command);
                        return Err(e);
                    }
                }
            }
            Command::BulkMove { deltas } => self.step_bulk(deltas, direction).await?,
        };

        tracing::info!(direction = ?direction, "[Organizer] {}", description);
        self.ctx.activity.record(match direction {
            Direction::Undo => ActivityEvent::Undo {
                description: description.clone(),
            },
            Direction::Redo => ActivityEvent::Redo {
                description: description.clone(),
            },
        });
        Ok(Some(HistoryOutcome { description, files }))
    }

    fn load_file(&self, file_id: &str) -> Result<OrganizedFile, OrganizeError> {
        if let Some(entry) = self.skip_cache().get(file_id) {
            return Ok(entry.file.clone());
        }
        self.ctx
            .store
            .fetch_file(file_id)?
            .ok_or_else(|| OrganizeError::Store(StoreError::InvalidRecord(format!("unknown file {}", file_id))))
    }

    /// Reverse or re-apply one move or copy
    async fn step_delta(
        &self,
        delta: &FileDelta,
        is_copy: bool,
        direction: Direction,
    ) -> Result<OrganizedFile, OrganizeError> {
        let _guard = self.ctx.coordinator.begin_operation(&delta.file_id)?;
        let mut file = self.load_file(&delta.file_id)?;

        let mover = Arc::clone(&self.ctx.mover);
        let from = delta.from_path.clone();
        let to = delta.to_path.clone();
        run_blocking(move || match (is_copy, direction) {
            (false, Direction::Undo) => mover.move_item(&to, &from),
            (false, Direction::Redo) => mover.move_item(&from, &to),
            (true, Direction::Undo) => mover.remove_item(&to),
            (true, Direction::Redo) => mover.copy_item(&from, &to),
        })
        .await
        .map_err(|e| self.failure(&delta.file_name, e))?;

        match direction {
            Direction::Undo => {
                if !is_copy {
                    file.set_path(&delta.from_path)?;
                }
                file.restore(delta.original_status, delta.original_destination.clone())?;
            }
            Direction::Redo => {
                if !is_copy {
                    file.set_path(&delta.to_path)?;
                }
                file.restore(FileStatus::Completed, Some(delta.destination.clone()))?;
            }
        }
        self.ctx.store.save_file(&file)?;
        self.forget_skipped(&delta.file_id);
        Ok(file)
    }

    /// Skip reversal restores status and destination in memory only
    fn step_skip(
        &self,
        file_id: &str,
        previous_status: FileStatus,
        previous_destination: Option<crate::models::Destination>,
        direction: Direction,
    ) -> Result<OrganizedFile, OrganizeError> {
        let _guard = self.ctx.coordinator.begin_operation(file_id)?;
        let mut file = self.load_file(file_id)?;
        match direction {
            Direction::Undo => file.restore(previous_status, previous_destination)?,
            Direction::Redo => file.set_status(FileStatus::Skipped)?,
        }
        self.skip_cache().insert(
            file_id.to_string(),
            SkipEntry {
                file: file.clone(),
                dirty: true,
            },
        );
        Ok(file)
    }

    /// Step every delta of a bulk move as one history entry.
    ///
    /// On failure the deltas already stepped move to the opposite stack and
    /// the rest return to the stack they came from.
    async fn step_bulk(
        &self,
        deltas: Vec<FileDelta>,
        direction: Direction,
    ) -> Result<Vec<OrganizedFile>, OrganizeError> {
        let mut pending: VecDeque<FileDelta> = deltas.into();
        let mut done: Vec<FileDelta> = Vec::new();
        let mut files = Vec::new();

        loop {
            let next = match direction {
                Direction::Undo => pending.pop_back(),
                Direction::Redo => pending.pop_front(),
            };
            let Some(delta) = next else {
                break;
            };

            match self.step_delta(&delta, false, direction).await {
                Ok(file) => {
                    files.push(file);
                    done.push(delta);
                }
                Err(e) => {
                    match direction {
                        Direction::Undo => pending.push_back(delta),
                        Direction::Redo => pending.push_front(delta),
                    }
                    if !done.is_empty() {
                        if direction == Direction::Undo {
                            done.reverse();
                        }
                        self.finish(direction, Command::BulkMove { deltas: done });
                    }
                    self.give_back(
                        direction,
                        Command::BulkMove {
                            deltas: pending.into(),
                        },
                    );
                    return Err(e);
                }
            }
        }

        if direction == Direction::Undo {
            done.reverse();
        }
        self.finish(direction, Command::BulkMove { deltas: done });
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoordinationError;
    use crate::fs::LocalFileMover;
    use crate::models::{Destination, Suggestion, SuggestionSource};
    use crate::patterns::LearnedPattern;
    use crate::ports::{BookmarkGrantor, MemoryActivityLog};
    use crate::prediction::TrainingRecord;
    use crate::rules::Rule;
    use crate::store::MemoryStore;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        _dir: TempDir,
        inbox: PathBuf,
        docs: PathBuf,
        organizer: Organizer,
        store: Arc<MemoryStore>,
        activity: Arc<MemoryActivityLog>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("Downloads");
        let docs = dir.path().join("Documents");
        fs::create_dir_all(&inbox).unwrap();
        fs::create_dir_all(&docs).unwrap();

        let grantor = Arc::new(BookmarkGrantor::new());
        grantor.grant_with_token("docs", &docs);
        let mover = Arc::new(LocalFileMover::new(
            vec![inbox.clone(), docs.clone()],
            dir.path().join("Holding"),
        ));
        let store = Arc::new(MemoryStore::new());
        let activity = Arc::new(MemoryActivityLog::new());

        let organizer = Organizer::new(
            OrganizerConfig::default(),
            mover,
            grantor,
            store.clone(),
            activity.clone(),
        );
        organizer.start();

        Fixture {
            _dir: dir,
            inbox,
            docs,
            organizer,
            store,
            activity,
        }
    }

    fn ready_file(fx: &Fixture, name: &str, destination: Destination) -> OrganizedFile {
        let path = fx.inbox.join(name);
        fs::write(&path, name).unwrap();
        let mut file = OrganizedFile::from_path(&path, "downloads").unwrap();
        file.apply_suggestion(Suggestion {
            destination,
            confidence: 0.95,
            source: SuggestionSource::Rule,
            reason: "test".into(),
            rule_id: None,
        });
        fx.store.save_file(&file).unwrap();
        file
    }

    fn docs() -> Destination {
        Destination::folder("docs", "Documents")
    }

    #[tokio::test]
    async fn test_organize_undo_redo() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());

        fx.organizer.organize_file(&mut file).await.unwrap();
        assert_eq!(file.status(), FileStatus::Completed);
        assert_eq!(file.path(), fx.docs.join("a.pdf"));
        assert!(fx.docs.join("a.pdf").exists());

        let undone = fx.organizer.undo().await.unwrap().unwrap();
        assert_eq!(undone.description, "Move a.pdf to Documents");
        assert_eq!(undone.files[0].status(), FileStatus::Ready);
        assert_eq!(undone.files[0].destination(), Some(&docs()));
        assert!(fx.inbox.join("a.pdf").exists());
        assert!(!fx.docs.join("a.pdf").exists());
        assert!(fx.organizer.can_redo());

        let redone = fx.organizer.redo().await.unwrap().unwrap();
        assert_eq!(redone.files[0].status(), FileStatus::Completed);
        assert!(fx.docs.join("a.pdf").exists());
        assert!(fx.organizer.can_undo());
        assert!(!fx.organizer.can_redo());

        let events = fx.activity.events();
        assert!(matches!(events[0], ActivityEvent::FileOrganized { .. }));
        assert!(matches!(events[1], ActivityEvent::Undo { .. }));
        assert!(matches!(events[2], ActivityEvent::Redo { .. }));
    }

    #[tokio::test]
    async fn test_stopped_organizer_refuses_work() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());
        fx.organizer.stop();

        assert!(matches!(
            fx.organizer.organize_file(&mut file).await,
            Err(OrganizeError::Stopped)
        ));
        assert!(matches!(fx.organizer.undo().await, Err(OrganizeError::Stopped)));
        assert!(fx.inbox.join("a.pdf").exists());
    }

    #[tokio::test]
    async fn test_duplicate_trigger_is_silent() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());

        let _held = fx.organizer.coordinator().begin_operation(file.id()).unwrap();
        let err = fx.organizer.organize_file(&mut file).await.unwrap_err();
        assert!(err.is_silent());
        assert!(matches!(
            err,
            OrganizeError::Coordination(CoordinationError::AlreadyInProgress(_))
        ));
        assert!(fx.inbox.join("a.pdf").exists());
    }

    #[tokio::test]
    async fn test_missing_destination_fails_without_history() {
        let fx = fixture();
        let path = fx.inbox.join("a.pdf");
        fs::write(&path, "x").unwrap();
        let mut file = OrganizedFile::from_path(&path, "downloads").unwrap();

        let err = fx.organizer.organize_file(&mut file).await.unwrap_err();
        assert!(matches!(
            err,
            OrganizeError::Execution {
                source: ExecutionError::MissingDestination(_),
                ..
            }
        ));
        assert!(!fx.organizer.can_undo());
        assert!(matches!(fx.activity.events()[0], ActivityEvent::OrganizeFailed { .. }));
    }

    #[tokio::test]
    async fn test_skip_and_undo_restores_state() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());

        fx.organizer.skip_file(&mut file).unwrap();
        assert_eq!(file.status(), FileStatus::Skipped);

        let undone = fx.organizer.undo().await.unwrap().unwrap();
        assert_eq!(undone.files[0].status(), FileStatus::Ready);
        assert_eq!(undone.files[0].destination(), Some(&docs()));
        assert!(fx.inbox.join("a.pdf").exists());
    }

    /// Counts store traffic while delegating to an in-memory store
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        fetches: AtomicUsize,
        saves: AtomicUsize,
    }

    impl CountingStore {
        fn traffic(&self) -> (usize, usize) {
            (self.fetches.load(Ordering::SeqCst), self.saves.load(Ordering::SeqCst))
        }
    }

    impl PersistentStore for CountingStore {
        fn save_file(&self, file: &OrganizedFile) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save_file(file)
        }

        fn fetch_files(
            &self,
            predicate: &dyn Fn(&OrganizedFile) -> bool,
        ) -> Result<Vec<OrganizedFile>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_files(predicate)
        }

        fn save_rule(&self, rule: &Rule) -> Result<(), StoreError> {
            self.inner.save_rule(rule)
        }

        fn delete_rule(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_rule(id)
        }

        fn fetch_rules(&self) -> Result<Vec<Rule>, StoreError> {
            self.inner.fetch_rules()
        }

        fn save_pattern(&self, pattern: &LearnedPattern) -> Result<(), StoreError> {
            self.inner.save_pattern(pattern)
        }

        fn fetch_patterns(&self) -> Result<Vec<LearnedPattern>, StoreError> {
            self.inner.fetch_patterns()
        }

        fn save_training_record(&self, record: &TrainingRecord) -> Result<(), StoreError> {
            self.inner.save_training_record(record)
        }

        fn fetch_training_records(&self) -> Result<Vec<TrainingRecord>, StoreError> {
            self.inner.fetch_training_records()
        }
    }

    #[tokio::test]
    async fn test_skip_replay_stays_in_memory_until_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CountingStore::default());
        let organizer = Organizer::new(
            OrganizerConfig::default(),
            Arc::new(LocalFileMover::new(vec![dir.path().to_path_buf()], dir.path().join("Holding"))),
            Arc::new(BookmarkGrantor::new()),
            store.clone(),
            Arc::new(MemoryActivityLog::new()),
        );
        organizer.start();

        let path = dir.path().join("a.pdf");
        fs::write(&path, "x").unwrap();
        let mut file = OrganizedFile::from_path(&path, "downloads").unwrap();
        file.apply_suggestion(Suggestion {
            destination: docs(),
            confidence: 0.95,
            source: SuggestionSource::Rule,
            reason: "test".into(),
            rule_id: None,
        });
        organizer.skip_file(&mut file).unwrap();
        let after_skip = store.traffic();

        let undone = organizer.undo().await.unwrap().unwrap();
        assert_eq!(undone.files[0].status(), FileStatus::Ready);
        let redone = organizer.redo().await.unwrap().unwrap();
        assert_eq!(redone.files[0].status(), FileStatus::Skipped);
        organizer.undo().await.unwrap().unwrap();
        assert_eq!(store.traffic(), after_skip);

        let stored = store.inner.fetch_file(file.id()).unwrap().unwrap();
        assert_eq!(stored.status(), FileStatus::Skipped);

        assert_eq!(organizer.flush_pending().unwrap(), 1);
        let stored = store.inner.fetch_file(file.id()).unwrap().unwrap();
        assert_eq!(stored.status(), FileStatus::Ready);
        assert_eq!(stored.destination(), Some(&docs()));
        assert_eq!(organizer.flush_pending().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stop_persists_restored_skips() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());
        fx.organizer.skip_file(&mut file).unwrap();
        fx.organizer.undo().await.unwrap().unwrap();

        fx.organizer.stop();
        let stored = fx.store.fetch_file(file.id()).unwrap().unwrap();
        assert_eq!(stored.status(), FileStatus::Ready);
    }

    #[tokio::test]
    async fn test_failed_undo_returns_command() {
        let fx = fixture();
        let mut file = ready_file(&fx, "a.pdf", docs());
        fx.organizer.organize_file(&mut file).await.unwrap();

        fs::remove_file(fx.docs.join("a.pdf")).unwrap();
        let err = fx.organizer.undo().await.unwrap_err();
        assert!(matches!(
            err,
            OrganizeError::Execution {
                source: ExecutionError::NotFound(_),
                ..
            }
        ));
        assert!(fx.organizer.can_undo());
        assert!(!fx.organizer.can_redo());
    }

    #[tokio::test]
    async fn test_trash_is_undoable() {
        let fx = fixture();
        let mut file = ready_file(&fx, "setup.dmg", Destination::Trash);

        fx.organizer.execute(&mut file, RuleAction::Delete).await.unwrap();
        assert!(!fx.inbox.join("setup.dmg").exists());
        assert!(file.path().exists());

        fx.organizer.undo().await.unwrap().unwrap();
        assert_eq!(fs::read_to_string(fx.inbox.join("setup.dmg")).unwrap(), "setup.dmg");
    }

    #[tokio::test]
    async fn test_copy_undo_removes_copy() {
        let fx = fixture();
        let mut file = ready_file(&fx, "notes.txt", docs());

        fx.organizer.execute(&mut file, RuleAction::Copy).await.unwrap();
        assert!(fx.inbox.join("notes.txt").exists());
        assert!(fx.docs.join("notes.txt").exists());
        assert_eq!(file.path(), fx.inbox.join("notes.txt"));

        fx.organizer.undo().await.unwrap().unwrap();
        assert!(fx.inbox.join("notes.txt").exists());
        assert!(!fx.docs.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_undo_on_empty_history() {
        let fx = fixture();
        assert_eq!(fx.organizer.undo().await.unwrap(), None);
        assert_eq!(fx.organizer.redo().await.unwrap(), None);
    }
}
