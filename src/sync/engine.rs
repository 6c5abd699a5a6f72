//! Synchronization engine.
//!
//! Drives the mirror through its lifecycle:
//!
//! 1. [`SyncEngine::start`] (Uninitialized → InitialSync) decides which
//!    files on disk were edited while the mirror was down. Those files are
//!    *protected*: their content must not be silently replaced.
//! 2. [`SyncEngine::finish_startup`] (InitialSync → Running) runs after the
//!    first remote sync and reconciles every note against disk.
//! 3. [`SyncEngine::write_files`] (Running) writes back only changed notes.
//!
//! # Startup decisions
//!
//! | file on disk            | remote changed | protected | result                         |
//! |-------------------------|----------------|-----------|--------------------------------|
//! | note is virtual         | -              | -         | soft-delete existing file      |
//! | absent                  | -              | -         | write file                     |
//! | same content            | -              | -         | nothing                        |
//! | differs                 | yes            | no        | overwrite file                 |
//! | differs                 | yes            | yes       | backup note, file wins         |
//! | differs                 | no             | -         | load file into note            |
//! | id matches no note      | -              | -         | soft-delete                    |
//! | no id                   | -              | -         | create note                    |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::codec::{self, read_lines};
use crate::config::SyncConfig;
use crate::storage::{NoteStore, Snapshot};
use crate::sync::address::FileRef;
use crate::sync::backup::backup_note;
use crate::sync::export::{write_back, Exporter, Placement};
use crate::sync::file::{find_files, soft_delete};
use crate::sync::import::{load_file, load_new_files};
use crate::sync::types::{NoteFile, StateCell, SyncError, SyncOutcome, SyncResult, SyncState};

/// The sync state machine.
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncConfig,
    state: StateCell,
    protected: HashSet<PathBuf>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self::with_state(config, StateCell::new())
    }

    /// Create an engine sharing an existing state cell.
    #[must_use]
    pub fn with_state(config: SyncConfig, state: StateCell) -> Self {
        Self {
            config,
            state,
            protected: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    /// Handle for observing the state without the engine.
    #[must_use]
    pub fn state_cell(&self) -> StateCell {
        self.state.clone()
    }

    /// Files found to deviate from the cached snapshot at startup.
    #[must_use]
    pub const fn protected_files(&self) -> &HashSet<PathBuf> {
        &self.protected
    }

    /// Begin startup: compute the protected files.
    ///
    /// Without a cached snapshot every note file is protected. With one,
    /// each file is parsed against the cached note it names; the file is
    /// protected if the note is missing or is dirty after parsing, which
    /// covers cached notes with unpushed edits whose file already matches.
    /// The store is restored to the snapshot afterwards, so the check
    /// leaves no trace.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` unless the engine is
    /// uninitialized, or an I/O error if a file cannot be read.
    pub fn start<S: NoteStore + ?Sized>(
        &mut self,
        store: &mut S,
        cached: Option<&Snapshot>,
    ) -> SyncResult<()> {
        self.state.expect("start sync", SyncState::Uninitialized)?;
        self.protected.clear();

        match cached {
            None => {
                let files = find_files(&self.config)?;
                self.protected.extend(files.into_iter().map(|(path, _)| path));
            }
            Some(snapshot) => {
                store.restore(snapshot);
                let protected = self.deviating_files(store);
                store.restore(snapshot);
                self.protected = protected?;
            }
        }

        info!(protected = self.protected.len(), "Initial sync started");
        self.state.set(SyncState::InitialSync);
        Ok(())
    }

    fn deviating_files<S: NoteStore + ?Sized>(&self, store: &mut S) -> SyncResult<HashSet<PathBuf>> {
        let mut protected = HashSet::new();
        for (path, file_ref) in find_files(&self.config)? {
            if file_deviates(store, &path, &file_ref)? {
                debug!(file = %path.display(), "File differs from cached note");
                protected.insert(path);
            }
        }
        Ok(protected)
    }

    /// Reconcile every note against disk after the first remote sync.
    ///
    /// `updated` holds the ids the remote sync changed. See the module
    /// docs for the decision table.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` unless startup is in progress, or
    /// the first I/O error. A failed pass is not rolled back.
    pub fn finish_startup<S: NoteStore + ?Sized>(
        &mut self,
        store: &mut S,
        updated: &HashSet<String>,
    ) -> SyncResult<SyncOutcome> {
        self.state.expect("finish startup", SyncState::InitialSync)?;

        store.recount_titles();
        let files: Vec<NoteFile> = store
            .notes()
            .into_iter()
            .map(|note| NoteFile::from_note(&self.config, &*store, note))
            .collect();

        let today = Local::now().date_naive();
        let mut exporter = Exporter::new(&self.config)?;
        let mut pending_loads: Vec<(PathBuf, String)> = Vec::new();

        for file in &files {
            let Placement::Differs(path) = exporter.export(file)? else {
                continue;
            };
            if !updated.contains(&file.id) {
                pending_loads.push((path, file.id.clone()));
            } else if self.protected.contains(&path) {
                warn!(file = %path.display(), id = %file.id, "Conflicting edits, backing up remote note");
                let note = store
                    .get(&file.id)
                    .ok_or_else(|| SyncError::NoteNotFound(file.id.clone()))?;
                let backup = backup_note(note, today);
                store.add(backup);
                load_file(store, &path, &file.id)?;
                exporter.outcome_mut().stats.conflicts += 1;
            } else {
                exporter.overwrite(&path, file)?;
            }
        }

        let (orphans, mut outcome) = exporter.finish();
        for path in orphans {
            soft_delete(&path)?;
            outcome.stats.soft_deleted += 1;
        }

        for (path, id) in pending_loads {
            load_file(store, &path, &id)?;
            outcome.stats.loaded += 1;
        }

        let (renames, created) = load_new_files(&self.config, store)?;
        outcome.renames.extend(renames);
        outcome.stats.created += created;

        self.protected.clear();
        self.state.set(SyncState::Running);
        info!(
            written = outcome.stats.written,
            overwritten = outcome.stats.overwritten,
            loaded = outcome.stats.loaded,
            conflicts = outcome.stats.conflicts,
            soft_deleted = outcome.stats.soft_deleted,
            created = outcome.stats.created,
            "Initial sync finished"
        );
        Ok(outcome)
    }

    /// Steady-state write-back.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` unless running, or the first I/O
    /// error.
    pub fn write_files(&self, files: &[NoteFile]) -> SyncResult<SyncOutcome> {
        self.state.expect("write files", SyncState::Running)?;
        write_back(&self.config, files)
    }

    /// Return to `Uninitialized` so a new account can start fresh.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` unless running.
    pub fn logout(&mut self) -> SyncResult<()> {
        self.state.expect("log out", SyncState::Running)?;
        self.protected.clear();
        self.state.set(SyncState::Uninitialized);
        Ok(())
    }

    /// Move to `ShuttingDown`. Allowed from any state.
    pub fn shutdown(&self) {
        self.state.set(SyncState::ShuttingDown);
    }
}

/// Whether a file must win over its cached note: the note is missing, or
/// it is dirty once the file is parsed into it.
fn file_deviates<S: NoteStore + ?Sized>(
    store: &mut S,
    path: &Path,
    file_ref: &FileRef,
) -> SyncResult<bool> {
    let Some(id) = file_ref.id.as_deref() else {
        return Ok(true);
    };
    let Some(note) = store.get_mut(id) else {
        return Ok(true);
    };
    let lines = read_lines(path)?;
    codec::parse(&lines, note);
    Ok(note.is_dirty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Note, NoteBody};
    use crate::storage::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn engine() -> (TempDir, SyncEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = SyncEngine::new(SyncConfig::new(temp_dir.path().join("notes")));
        (temp_dir, engine)
    }

    #[test]
    fn test_state_transitions() {
        let (_tmp, mut engine) = engine();
        let mut store = MemoryStore::new();
        assert_eq!(engine.state(), SyncState::Uninitialized);

        assert!(engine.write_files(&[]).is_err());
        assert!(engine.finish_startup(&mut store, &HashSet::new()).is_err());

        engine.start(&mut store, None).unwrap();
        assert_eq!(engine.state(), SyncState::InitialSync);
        assert!(engine.start(&mut store, None).is_err());

        engine.finish_startup(&mut store, &HashSet::new()).unwrap();
        assert_eq!(engine.state(), SyncState::Running);
        assert!(engine.write_files(&[]).is_ok());

        engine.logout().unwrap();
        assert_eq!(engine.state(), SyncState::Uninitialized);

        engine.shutdown();
        assert_eq!(engine.state(), SyncState::ShuttingDown);
    }

    #[test]
    fn test_no_snapshot_protects_all_files() {
        let (_tmp, mut engine) = engine();
        let dir = engine.config().sync_dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.note"), "# a\nid: 1\n").unwrap();
        fs::write(dir.join("b.note"), "plain\n").unwrap();

        engine.start(&mut MemoryStore::new(), None).unwrap();

        assert_eq!(engine.protected_files().len(), 2);
    }

    #[test]
    fn test_startup_check_leaves_store_untouched() {
        let (_tmp, mut engine) = engine();
        let dir = engine.config().sync_dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();

        let note = Note::from_remote("n1", "Title", NoteBody::Text("cached".into()), 10);
        let snapshot = Snapshot {
            version: None,
            notes: vec![note],
        };
        fs::write(dir.join("Title.note"), "# Title\nid: n1\n\nedited offline\n").unwrap();

        let mut store = MemoryStore::new();
        engine.start(&mut store, Some(&snapshot)).unwrap();

        assert!(engine.protected_files().contains(&dir.join("Title.note")));
        assert_eq!(store.dump(), snapshot);
    }

    #[test]
    fn test_matching_file_not_protected() {
        let (_tmp, mut engine) = engine();
        let dir = engine.config().sync_dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();

        let note = Note::from_remote("n1", "Title", NoteBody::Text("same".into()), 10);
        let lines = codec::serialize(&note);
        crate::sync::file::write_lines(&dir.join("Title.note"), &lines).unwrap();
        let snapshot = Snapshot {
            version: None,
            notes: vec![note],
        };

        engine.start(&mut MemoryStore::new(), Some(&snapshot)).unwrap();

        assert!(engine.protected_files().is_empty());
    }

    #[test]
    fn test_dirty_cached_note_protects_matching_file() {
        let (_tmp, mut engine) = engine();
        let dir = engine.config().sync_dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();

        let mut note = Note::from_remote("n1", "Title", NoteBody::Text("cached".into()), 10);
        note.set_text("edited before shutdown");
        let lines = codec::serialize(&note);
        crate::sync::file::write_lines(&dir.join("Title.note"), &lines).unwrap();
        let snapshot = Snapshot {
            version: None,
            notes: vec![note],
        };

        let mut store = MemoryStore::new();
        engine.start(&mut store, Some(&snapshot)).unwrap();

        assert!(engine.protected_files().contains(&dir.join("Title.note")));
        assert_eq!(store.dump(), snapshot);
    }
}
