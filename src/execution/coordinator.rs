//! Per-file operation coordination.
//!
//! At most one operation runs per file id. A cancellation request is recorded
//! against an in-flight id and observed cooperatively, either by the running
//! operation polling `is_cancelled` or by the next `begin_operation` for that
//! id.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CoordinationError;

#[derive(Debug, Default)]
struct CoordinatorState {
    in_progress: HashSet<String>,
    cancelled: HashSet<String>,
}

/// Owns the in-progress and cancelled sets. Only its methods mutate them.
#[derive(Debug, Default)]
pub struct OperationCoordinator {
    state: Mutex<CoordinatorState>,
}

impl OperationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an operation for `file_id`.
    ///
    /// Fails with `AlreadyInProgress` while one is running; the running
    /// operation keeps its registration and any pending cancellation. A
    /// cancellation left over for an idle id is consumed and reported as
    /// `OperationCancelled`. The returned guard finishes the operation when
    /// dropped.
    pub fn begin_operation(&self, file_id: &str) -> Result<OperationGuard<'_>, CoordinationError> {
        let mut state = self.state();

        if state.in_progress.contains(file_id) {
            return Err(CoordinationError::AlreadyInProgress(file_id.to_string()));
        }
        if state.cancelled.remove(file_id) {
            return Err(CoordinationError::OperationCancelled(file_id.to_string()));
        }
        state.in_progress.insert(file_id.to_string());

        Ok(OperationGuard {
            coordinator: self,
            file_id: file_id.to_string(),
        })
    }

    /// Remove `file_id` from both sets. Calling it twice is harmless.
    pub fn finish_operation(&self, file_id: &str) {
        let mut state = self.state();
        state.in_progress.remove(file_id);
        state.cancelled.remove(file_id);
    }

    /// Request cancellation; ignored unless the operation is in flight
    pub fn cancel_operation(&self, file_id: &str) -> bool {
        let mut state = self.state();
        if state.in_progress.contains(file_id) {
            state.cancelled.insert(file_id.to_string());
            tracing::debug!(file = file_id, "[Coordinator] Cancellation requested");
            true
        } else {
            false
        }
    }

    /// Request cancellation of every in-flight operation
    pub fn cancel_all_operations(&self) -> usize {
        let mut state = self.state();
        let ids: Vec<String> = state.in_progress.iter().cloned().collect();
        let count = ids.len();
        state.cancelled.extend(ids);
        if count > 0 {
            tracing::info!(count, "[Coordinator] Cancelling all operations");
        }
        count
    }

    pub fn is_cancelled(&self, file_id: &str) -> bool {
        self.state().cancelled.contains(file_id)
    }

    pub fn is_in_progress(&self, file_id: &str) -> bool {
        self.state().in_progress.contains(file_id)
    }

    pub fn in_progress_count(&self) -> usize {
        self.state().in_progress.len()
    }
}

/// Registration for one in-flight operation; finishes it on drop
#[derive(Debug)]
pub struct OperationGuard<'a> {
    coordinator: &'a OperationCoordinator,
    file_id: String,
}

impl OperationGuard<'_> {
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Whether cancellation was requested since this operation began
    pub fn is_cancelled(&self) -> bool {
        self.coordinator.is_cancelled(&self.file_id)
    }

    /// Fail with `OperationCancelled` if a cancellation is pending
    pub fn checkpoint(&self) -> Result<(), CoordinationError> {
        if self.is_cancelled() {
            return Err(CoordinationError::OperationCancelled(self.file_id.clone()));
        }
        Ok(())
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.finish_operation(&self.file_id);
    }
}

/// Shared cancellation flag for long-running loops
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_per_file() {
        let coordinator = OperationCoordinator::new();
        let guard = coordinator.begin_operation("a").unwrap();

        assert_eq!(
            coordinator.begin_operation("a").unwrap_err(),
            CoordinationError::AlreadyInProgress("a".into())
        );
        // other ids are independent
        assert!(coordinator.begin_operation("b").is_ok());

        drop(guard);
        assert!(coordinator.begin_operation("a").is_ok());
    }

    #[test]
    fn test_cancel_in_flight_operation() {
        let coordinator = OperationCoordinator::new();
        let guard = coordinator.begin_operation("a").unwrap();

        assert!(coordinator.cancel_operation("a"));
        assert!(guard.is_cancelled());
        assert!(guard.checkpoint().is_err());
        drop(guard);

        // finishing clears the cancellation too
        assert!(!coordinator.is_cancelled("a"));
        assert!(coordinator.begin_operation("a").is_ok());
    }

    #[test]
    fn test_cancel_idle_file_is_ignored() {
        let coordinator = OperationCoordinator::new();
        assert!(!coordinator.cancel_operation("idle"));
        assert!(!coordinator.is_cancelled("idle"));
        assert!(coordinator.begin_operation("idle").is_ok());
    }

    #[test]
    fn test_duplicate_during_cancellation_keeps_registration() {
        let coordinator = OperationCoordinator::new();
        let first = coordinator.begin_operation("a.pdf").unwrap();
        assert!(coordinator.cancel_operation("a.pdf"));

        assert_eq!(
            coordinator.begin_operation("a.pdf").unwrap_err(),
            CoordinationError::AlreadyInProgress("a.pdf".into())
        );
        // the running operation still sees its cancellation
        assert!(first.is_cancelled());
        assert!(coordinator.is_in_progress("a.pdf"));
        assert_eq!(
            coordinator.begin_operation("a.pdf").unwrap_err(),
            CoordinationError::AlreadyInProgress("a.pdf".into())
        );

        drop(first);
        assert!(coordinator.begin_operation("a.pdf").is_ok());
    }

    #[test]
    fn test_leftover_cancellation_consumed_by_next_begin() {
        let coordinator = OperationCoordinator::new();
        let guard = coordinator.begin_operation("a").unwrap();
        coordinator.cancel_operation("a");
        // the operation ends without the guard clearing its cancellation
        std::mem::forget(guard);
        coordinator.state().in_progress.remove("a");

        assert_eq!(
            coordinator.begin_operation("a").unwrap_err(),
            CoordinationError::OperationCancelled("a".into())
        );
        assert!(!coordinator.is_cancelled("a"));
        assert!(coordinator.begin_operation("a").is_ok());
    }

    #[test]
    fn test_finish_is_idempotent_and_cancel_all() {
        let coordinator = OperationCoordinator::new();
        let a = coordinator.begin_operation("a").unwrap();
        let b = coordinator.begin_operation("b").unwrap();

        assert_eq!(coordinator.cancel_all_operations(), 2);
        assert!(a.is_cancelled() && b.is_cancelled());

        coordinator.finish_operation("a");
        coordinator.finish_operation("a");
        drop(a);
        drop(b);
        assert_eq!(coordinator.in_progress_count(), 0);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
