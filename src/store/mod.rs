//! `PersistentStore` implementations.
//!
//! ## Modules
//!
//! - `records` - Serialized shapes of persisted entities
//! - `memory` - In-memory store
//! - `sqlite` - SQLite store used in production

pub mod memory;
pub mod records;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
