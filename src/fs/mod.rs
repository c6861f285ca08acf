//! Local filesystem adapters.
//!
//! ## Modules
//!
//! - `io` - Symlink-safe file helpers
//! - `guard` - Granted-root and protected-path checks
//! - `mover` - `LocalFileMover`, the default `FileMover`

pub mod guard;
pub mod io;
pub mod mover;

pub use guard::{is_protected_path, PathGuard};
pub use io::{file_kind_no_follow, FileKind};
pub use mover::LocalFileMover;
