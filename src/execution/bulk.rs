//! Sequential bulk organization with partial-failure reporting.

use std::sync::Arc;

use super::apply::{place_file, run_blocking, ExecutionContext};
use super::commands::{Command, FileDelta};
use super::coordinator::CancelToken;
use crate::error::{CoordinationError, ExecutionError};
use crate::models::{FileStatus, FileView, OrganizedFile};
use crate::ports::ActivityEvent;

/// Progress after each processed item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkProgress {
    pub processed: usize,
    pub total: usize,
    pub percent: f64,
}

pub type ProgressCallback = dyn Fn(BulkProgress) + Send + Sync;

/// Result of a bulk run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub success_count: usize,
    pub failed_count: usize,
    /// Names of files that failed
    pub failed_files: Vec<String>,
    pub first_error: Option<String>,
    /// Ids of files left alone: already in flight, cancelled or already
    /// completed or skipped. Without early cancellation,
    /// `success_count + failed_count + skipped.len()` equals the batch size.
    pub skipped: Vec<String>,
    /// The run stopped early because its token was cancelled
    pub cancelled: bool,
}

impl BulkOutcome {
    /// Every attempted file succeeded
    pub fn is_success(&self) -> bool {
        self.failed_count == 0
    }

    fn record_failure(&mut self, file_name: &str, error: &ExecutionError) {
        self.failed_count += 1;
        self.failed_files.push(file_name.to_string());
        if self.first_error.is_none() {
            self.first_error = Some(format!("{}: {}", file_name, error));
        }
    }
}

pub struct BulkExecutor {
    ctx: ExecutionContext,
}

impl BulkExecutor {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Move every ready file to its destination, one at a time.
    ///
    /// Failures are collected and the loop continues. All successful moves
    /// are pushed to history as a single `BulkMove`.
    pub async fn execute(
        &self,
        files: &mut [OrganizedFile],
        cancel: &CancelToken,
        progress: Option<&ProgressCallback>,
    ) -> BulkOutcome {
        let total = files.len();
        let mut outcome = BulkOutcome::default();
        let mut deltas = Vec::new();

        tracing::info!(total, "[BulkExecutor] Starting");

        for (index, file) in files.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(processed = index, "[BulkExecutor] Cancelled");
                outcome.cancelled = true;
                break;
            }

            match self.organize_one(file).await {
                Ok(Some(delta)) => {
                    outcome.success_count += 1;
                    deltas.push(delta);
                }
                Ok(None) => outcome.skipped.push(file.id().to_string()),
                Err(e) => {
                    tracing::warn!(file = file.name(), "[BulkExecutor] Failed: {}", e);
                    outcome.record_failure(file.name(), &e);
                }
            }

            if let Some(report) = progress {
                let processed = index + 1;
                report(BulkProgress {
                    processed,
                    total,
                    percent: processed as f64 / total as f64 * 100.0,
                });
            }
        }

        if !deltas.is_empty() {
            let mut history = match self.ctx.history.lock() {
                Ok(h) => h,
                Err(poisoned) => poisoned.into_inner(),
            };
            history.push(Command::BulkMove { deltas });
        }

        if outcome.failed_count > 0 {
            self.ctx.activity.record(ActivityEvent::BulkPartialFailure {
                success_count: outcome.success_count,
                failed_count: outcome.failed_count,
                first_error: outcome.first_error.clone().unwrap_or_default(),
            });
        } else if outcome.success_count > 0 {
            self.ctx.activity.record(ActivityEvent::BulkCompleted {
                success_count: outcome.success_count,
            });
        }

        tracing::info!(
            succeeded = outcome.success_count,
            failed = outcome.failed_count,
            skipped = outcome.skipped.len(),
            "[BulkExecutor] Finished"
        );
        outcome
    }

    /// `Ok(None)` when the file was skipped rather than attempted
    async fn organize_one(&self, file: &mut OrganizedFile) -> Result<Option<FileDelta>, ExecutionError> {
        if matches!(file.status(), FileStatus::Completed | FileStatus::Skipped) {
            return Ok(None);
        }

        let guard = match self.ctx.coordinator.begin_operation(file.id()) {
            Ok(guard) => guard,
            Err(CoordinationError::AlreadyInProgress(_)) | Err(CoordinationError::OperationCancelled(_)) => {
                return Ok(None);
            }
        };

        let destination = file
            .destination()
            .cloned()
            .ok_or_else(|| ExecutionError::MissingDestination(file.name().to_string()))?;

        let mover = Arc::clone(&self.ctx.mover);
        let grantor = Arc::clone(&self.ctx.grantor);
        let from = file.path().to_path_buf();
        let target = destination.clone();
        let to_path = run_blocking(move || place_file(mover.as_ref(), grantor.as_ref(), &from, &target)).await?;

        let delta = FileDelta {
            file_id: file.id().to_string(),
            file_name: file.name().to_string(),
            from_path: file.path().to_path_buf(),
            to_path: to_path.clone(),
            original_status: file.status(),
            original_destination: Some(destination.clone()),
            destination,
        };

        file.set_path(&to_path)
            .map_err(|e| ExecutionError::Io(e.to_string()))?;
        file.set_status(FileStatus::Completed)
            .map_err(|e| ExecutionError::Io(e.to_string()))?;
        if let Err(e) = self.ctx.store.save_file(file) {
            tracing::warn!(file = file.name(), "[BulkExecutor] Failed to persist file: {}", e);
        }
        drop(guard);

        Ok(Some(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::commands::CommandStack;
    use crate::execution::coordinator::OperationCoordinator;
    use crate::fs::LocalFileMover;
    use crate::models::{Destination, Suggestion, SuggestionSource};
    use crate::ports::{BookmarkGrantor, MemoryActivityLog};
    use crate::store::MemoryStore;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct Fixture {
        _dir: tempfile::TempDir,
        inbox: PathBuf,
        docs: PathBuf,
        ctx: ExecutionContext,
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
        let activity = Arc::new(MemoryActivityLog::new());
        let ctx = ExecutionContext {
            coordinator: Arc::new(OperationCoordinator::new()),
            history: Arc::new(Mutex::new(CommandStack::default())),
            mover: Arc::new(LocalFileMover::new(
                vec![inbox.clone(), docs.clone()],
                dir.path().join("Holding"),
            )),
            grantor,
            store: Arc::new(MemoryStore::new()),
            activity: activity.clone(),
        };
        Fixture {
            _dir: dir,
            inbox,
            docs,
            ctx,
            activity,
        }
    }

    fn file(fx: &Fixture, name: &str, destination: Option<Destination>) -> OrganizedFile {
        let path = fx.inbox.join(name);
        fs::write(&path, name).unwrap();
        let mut file = OrganizedFile::from_path(&path, "downloads").unwrap();
        if let Some(destination) = destination {
            file.apply_suggestion(Suggestion {
                destination,
                confidence: 1.0,
                source: SuggestionSource::Rule,
                reason: "test".into(),
                rule_id: None,
            });
        }
        file
    }

    fn docs() -> Option<Destination> {
        Some(Destination::folder("docs", "Documents"))
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let fx = fixture();
        let mut files = vec![
            file(&fx, "a.pdf", docs()),
            file(&fx, "b.pdf", None),
            file(&fx, "c.pdf", docs()),
        ];

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: &ProgressCallback = &move |p: BulkProgress| sink.lock().unwrap().push(p.processed);

        let outcome = BulkExecutor::new(fx.ctx.clone())
            .execute(&mut files, &CancelToken::new(), Some(progress))
            .await;

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.failed_files, vec!["b.pdf".to_string()]);
        assert!(outcome.first_error.as_deref().unwrap().starts_with("b.pdf"));
        assert!(!outcome.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);

        assert!(fx.docs.join("a.pdf").exists());
        assert!(fx.docs.join("c.pdf").exists());
        assert!(fx.inbox.join("b.pdf").exists());
        assert_eq!(files[0].status(), FileStatus::Completed);

        let history = fx.ctx.history.lock().unwrap();
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.peek_undo().unwrap().description(), "Organize 2 files");

        let events = fx.activity.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ActivityEvent::BulkPartialFailure {
                success_count: 2,
                failed_count: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_next_item() {
        let fx = fixture();
        let mut files = vec![file(&fx, "a.pdf", docs()), file(&fx, "b.pdf", docs())];
        let token = CancelToken::new();
        token.cancel();

        let outcome = BulkExecutor::new(fx.ctx.clone())
            .execute(&mut files, &token, None)
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.success_count, 0);
        assert!(fx.inbox.join("a.pdf").exists());
        assert!(!fx.ctx.history.lock().unwrap().can_undo());
        assert!(fx.activity.events().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_file_is_skipped_not_failed() {
        let fx = fixture();
        let mut files = vec![file(&fx, "a.pdf", docs()), file(&fx, "b.pdf", docs())];
        let busy_id = files[0].id().to_string();
        let _held = fx.ctx.coordinator.begin_operation(&busy_id).unwrap();

        let outcome = BulkExecutor::new(fx.ctx.clone())
            .execute(&mut files, &CancelToken::new(), None)
            .await;

        assert_eq!(outcome.skipped, vec![busy_id]);
        assert_eq!(outcome.success_count, 1);
        assert!(outcome.is_success());
        assert!(fx.inbox.join("a.pdf").exists());
        assert!(matches!(
            fx.activity.events()[0],
            ActivityEvent::BulkCompleted { success_count: 1 }
        ));
    }

    #[tokio::test]
    async fn test_every_file_is_accounted_for_once() {
        let fx = fixture();
        let mut files = vec![
            file(&fx, "busy.pdf", docs()),
            file(&fx, "done.pdf", docs()),
            file(&fx, "nowhere.pdf", None),
            file(&fx, "a.pdf", docs()),
            file(&fx, "b.pdf", docs()),
        ];
        files[1].set_status(FileStatus::Completed).unwrap();
        let busy_id = files[0].id().to_string();
        let _held = fx.ctx.coordinator.begin_operation(&busy_id).unwrap();

        let outcome = BulkExecutor::new(fx.ctx.clone())
            .execute(&mut files, &CancelToken::new(), None)
            .await;

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(
            outcome.success_count + outcome.failed_count + outcome.skipped.len(),
            files.len()
        );
    }
}
