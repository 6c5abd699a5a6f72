//! Sync types.
//!
//! State machine, write-back inputs and pass results shared by the engine,
//! the exporter and the sync session.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::codec;
use crate::model::Note;
use crate::storage::NoteStore;
use crate::sync::address::NoteAddress;

/// Engine lifecycle.
///
/// Transitions only move forward, except `Running → Uninitialized` on
/// logout. Any state may move to `ShuttingDown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncState {
    Uninitialized = 0,
    InitialSync = 1,
    Running = 2,
    ShuttingDown = 3,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::InitialSync => "initial_sync",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::InitialSync,
            2 => Self::Running,
            3 => Self::ShuttingDown,
            _ => Self::Uninitialized,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free view of the engine state.
///
/// Background loops poll this instead of taking the engine lock.
#[derive(Debug, Clone, Default)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> SyncState {
        SyncState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SyncState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Fail unless the current state is `expected`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` naming the attempted operation.
    pub fn expect(&self, operation: &'static str, expected: SyncState) -> SyncResult<()> {
        let state = self.get();
        if state == expected {
            Ok(())
        } else {
            Err(SyncError::InvalidState { operation, state })
        }
    }
}

/// Write-back input for one note.
///
/// Built on the caller's thread right before a pass so the worker never
/// touches the store. `lines` is `None` exactly when the address is
/// virtual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    pub id: String,
    pub title: String,
    pub address: NoteAddress,
    pub lines: Option<Vec<String>>,
}

impl NoteFile {
    /// Snapshot a note's target address and serialized content.
    #[must_use]
    pub fn from_note<S: NoteStore + ?Sized>(config: &SyncConfig, store: &S, note: &Note) -> Self {
        let address = NoteAddress::for_note(config, store, note);
        let lines = (!address.is_virtual()).then(|| codec::serialize(note));
        Self {
            id: note.id().to_string(),
            title: note.title().to_string(),
            address,
            lines,
        }
    }

    /// The virtual address this note would have if it had no file.
    #[must_use]
    pub fn virtual_address(&self) -> NoteAddress {
        NoteAddress::Virtual {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }
}

/// Old address → new address, as strings the host can match against open
/// buffers.
pub type RenameMap = BTreeMap<String, String>;

/// Counters for one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Files created for notes that had none.
    pub written: usize,
    /// Existing files rewritten with remote content.
    pub overwritten: usize,
    /// Files parsed back into notes.
    pub loaded: usize,
    /// Backups made for conflicting edits.
    pub conflicts: usize,
    /// Files renamed to `.local`.
    pub soft_deleted: usize,
    /// Notes created from files without an id.
    pub created: usize,
}

impl SyncStats {
    /// Total number of file or note operations.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.written + self.overwritten + self.loaded + self.conflicts + self.soft_deleted + self.created
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Result of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub renames: RenameMap,
    pub stats: SyncStats,
}

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Operation not allowed in the current engine state.
    #[error("Cannot {operation} while sync is {state}")]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// State the engine was in.
        state: SyncState,
    },

    /// A note referenced by id is not in the store.
    #[error("Note not found: {0}")]
    NoteNotFound(String),
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_shared() {
        let cell = StateCell::new();
        let other = cell.clone();
        assert_eq!(cell.get(), SyncState::Uninitialized);

        other.set(SyncState::Running);
        assert_eq!(cell.get(), SyncState::Running);
    }

    #[test]
    fn test_state_cell_expect() {
        let cell = StateCell::new();
        assert!(cell.expect("start", SyncState::Uninitialized).is_ok());

        let err = cell.expect("write files", SyncState::Running).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidState {
                operation: "write files",
                state: SyncState::Uninitialized
            }
        ));
        assert_eq!(err.to_string(), "Cannot write files while sync is uninitialized");
    }

    #[test]
    fn test_sync_stats() {
        let mut stats = SyncStats::default();
        assert!(stats.is_empty());

        stats.written = 2;
        stats.soft_deleted = 1;
        assert_eq!(stats.total(), 3);
        assert!(!stats.is_empty());
    }
}
