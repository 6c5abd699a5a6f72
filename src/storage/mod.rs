//! Storage layer for notesync.
//!
//! # Submodules
//!
//! - [`notes`] - The note store interface the sync engine consumes, plus an
//!   in-memory implementation
//! - [`schema`] - Snapshot cache schema
//! - [`sqlite`] - SQLite snapshot cache

pub mod notes;
pub mod schema;
pub mod sqlite;

pub use notes::{MemoryStore, NoteStore, Snapshot};
pub use sqlite::SnapshotCache;
