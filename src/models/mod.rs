//! Domain models shared by the decision pipeline and the executor.

pub mod file;

pub use file::*;
