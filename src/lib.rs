//! Decision and execution core for a file organizer.
//!
//! Files discovered by a scan flow through the decision pipeline (rules,
//! then learned patterns, then a gated classifier prediction) and are then
//! moved, copied, trashed or skipped by the organizer, which keeps every
//! change reversible.
//!
//! ## Modules
//!
//! - `models` - organized files, destinations and suggestions
//! - `rules` - conditions, rule matching and the ordered rule engine
//! - `patterns` - learned patterns, their matcher and the learner
//! - `prediction` - classifier port, outcome window and the prediction gate
//! - `pipeline` - rule > pattern > prediction decision order
//! - `execution` - coordinator, command history, bulk runs and the organizer
//! - `ports` - collaborator traits and their local implementations
//! - `fs` - guarded local file mover
//! - `store` - in-memory and SQLite persistence
//! - `scan` - discovery of candidate files

pub mod config;
pub mod error;
pub mod execution;
pub mod fs;
pub mod logging;
pub mod models;
pub mod patterns;
pub mod pipeline;
pub mod ports;
pub mod prediction;
pub mod rules;
pub mod scan;
pub mod store;
pub mod utils;

pub use config::OrganizerConfig;
pub use error::{CoordinationError, ExecutionError, ModelError, OrganizeError, StoreError};
pub use execution::{BulkOutcome, CancelToken, Organizer};
pub use logging::init_tracing;
pub use models::{Destination, FileStatus, OrganizedFile};
pub use pipeline::{DecisionPipeline, DecisionSummary};
