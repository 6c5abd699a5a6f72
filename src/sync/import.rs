//! File → note import.
//!
//! Two directions of import exist:
//! - **Load**: parse a file back into the note named by its header id
//! - **Create**: turn a file without an id into a brand new note, then
//!   stamp the new id and title into the file so it is tracked from now on

use std::path::{Path, PathBuf};

use tracing::info;

use crate::codec::{self, detect_kind, read_lines, write_file_header};
use crate::config::SyncConfig;
use crate::model::Note;
use crate::storage::NoteStore;
use crate::sync::address::{file_path, FileRef};
use crate::sync::file::find_files;
use crate::sync::types::{RenameMap, SyncError, SyncResult};

/// Parse a file into an existing note.
///
/// Returns whether the note changed.
///
/// # Errors
///
/// Returns `SyncError::NoteNotFound` if the note is not in the store, or
/// an I/O error if the file cannot be read.
pub fn load_file<S: NoteStore + ?Sized>(store: &mut S, path: &Path, id: &str) -> SyncResult<bool> {
    let lines = read_lines(path)?;
    let note = store
        .get_mut(id)
        .ok_or_else(|| SyncError::NoteNotFound(id.to_string()))?;
    let changed = codec::parse(&lines, note);
    if changed {
        info!(file = %path.display(), id, "Loaded local edits");
    }
    Ok(changed)
}

/// Create a note from a file that has no id yet.
///
/// The kind is guessed from the first lines; an empty title falls back to
/// the file's title (header or stem). The id and title are written back
/// into the file's header. Returns the new id and, if the note's canonical
/// path differs from `path`, that path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or rewritten.
pub fn create_note_from_file<S: NoteStore + ?Sized>(
    config: &SyncConfig,
    store: &mut S,
    path: &Path,
    file_ref: &FileRef,
) -> SyncResult<(String, Option<PathBuf>)> {
    let lines = read_lines(path)?;
    let mut note = Note::new(detect_kind(&lines));
    if let Some(id) = &file_ref.id {
        note.set_id(id);
    }
    codec::parse(&lines, &mut note);
    if note.title().is_empty() {
        note.set_title(&file_ref.title);
    }

    let id = note.id().to_string();
    let title = note.title().to_string();
    info!(file = %path.display(), %id, kind = %note.kind(), "Creating note from file");
    store.add(note);
    write_file_header(path, &id, &title)?;

    let target = store
        .get(&id)
        .and_then(|note| file_path(config, store.has_unique_title(note), note))
        .filter(|target| target != path);
    Ok((id, target))
}

/// Create notes for every file under the sync directory without an id.
///
/// Returns renames for files whose canonical path differs from where they
/// were found, and the number of notes created.
///
/// # Errors
///
/// Returns an error if the directory cannot be scanned or a file fails.
pub fn load_new_files<S: NoteStore + ?Sized>(
    config: &SyncConfig,
    store: &mut S,
) -> SyncResult<(RenameMap, usize)> {
    let mut renames = RenameMap::new();
    let mut created = 0;
    for (path, file_ref) in find_files(config)? {
        if file_ref.id.is_some() {
            continue;
        }
        let (_, target) = create_note_from_file(config, store, &path, &file_ref)?;
        created += 1;
        if let Some(target) = target {
            renames.insert(path.display().to_string(), target.display().to_string());
        }
    }
    Ok((renames, created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteKind;
    use crate::storage::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_file_updates_note() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MemoryStore::new();
        let mut note = Note::freeform("T", "old");
        note.mark_clean();
        let id = note.id().to_string();
        store.add(note);

        let path = temp_dir.path().join("T.note");
        fs::write(&path, format!("# T\nid: {id}\n\nnew\n")).unwrap();

        assert!(load_file(&mut store, &path, &id).unwrap());
        let note = store.get(&id).unwrap();
        assert_eq!(note.text(), Some("new"));
        assert!(note.is_dirty());
    }

    #[test]
    fn test_load_file_missing_note() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("T.note");
        fs::write(&path, "# T\nid: ghost\n").unwrap();

        let err = load_file(&mut MemoryStore::new(), &path, "ghost").unwrap_err();
        assert!(matches!(err, SyncError::NoteNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_create_note_from_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::new(temp_dir.path());
        let path = config.sync_dir().join("Ideas.note");
        fs::write(&path, "[ ] one\n[x] two\n").unwrap();
        let mut store = MemoryStore::new();

        let file_ref = FileRef { id: None, title: "Ideas".into() };
        let (id, target) = create_note_from_file(&config, &mut store, &path, &file_ref).unwrap();

        assert!(target.is_none());
        let note = store.get(&id).unwrap();
        assert_eq!(note.kind(), NoteKind::Checklist);
        assert_eq!(note.title(), "Ideas");
        assert_eq!(note.items().unwrap().len(), 2);
        assert!(note.is_dirty());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&format!("# Ideas\nid: {id}\n")));
    }

    #[test]
    fn test_load_new_files_reports_rename() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::new(temp_dir.path());
        let path = config.sync_dir().join("draft.note");
        fs::write(&path, "# Real Title\n\nbody\n").unwrap();
        let mut store = MemoryStore::new();

        let (renames, created) = load_new_files(&config, &mut store).unwrap();

        assert_eq!(created, 1);
        assert_eq!(
            renames.get(&path.display().to_string()),
            Some(&config.sync_dir().join("Real Title.note").display().to_string())
        );
        let note = store.notes()[0];
        assert_eq!(note.title(), "Real Title");
        assert_eq!(note.text(), Some("body"));
    }
}
