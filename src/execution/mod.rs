//! Execution Engine Module
//!
//! Turns decided files into filesystem changes and keeps them reversible.
//!
//! ## Modules
//!
//! - `coordinator` - single-flight registration and cooperative cancellation per file
//! - `commands` - reversible command deltas and the bounded undo / redo stacks
//! - `apply` - destination resolution and blocking placement shared by all paths
//! - `bulk` - sequential batch runs with partial-failure reporting
//! - `organizer` - the service callers drive: organize, copy, skip, undo, redo

pub mod apply;
pub mod bulk;
pub mod commands;
pub mod coordinator;
pub mod organizer;

pub use apply::{resolve_target, ExecutionContext};
pub use bulk::{BulkExecutor, BulkOutcome, BulkProgress, ProgressCallback};
pub use commands::{Command, CommandHistory, CommandStack, FileDelta};
pub use coordinator::{CancelToken, OperationCoordinator, OperationGuard};
pub use organizer::{HistoryOutcome, Organizer};
