//! Note addressing.
//!
//! Maps a note to where it lives: a file under the sync directory, or a
//! virtual `note://<id>/<title>.note` address when it has no file
//! (trashed, or archived while archival sync is off). Also resolves a file
//! back to the note identity recorded in its header.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::codec::read_header;
use crate::config::{SyncConfig, NOTE_EXT};
use crate::model::Note;
use crate::storage::NoteStore;

/// Scheme prefix of virtual addresses.
pub const VIRTUAL_SCHEME: &str = "note://";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.\-]").expect("valid filename regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Where a note is mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteAddress {
    /// A file on disk.
    File(PathBuf),
    /// No file; the note is reachable only through its id.
    Virtual { id: String, title: String },
}

impl NoteAddress {
    /// Compute the address a note should have right now.
    #[must_use]
    pub fn for_note<S: NoteStore + ?Sized>(config: &SyncConfig, store: &S, note: &Note) -> Self {
        match file_path(config, store.has_unique_title(note), note) {
            Some(path) => Self::File(path),
            None => Self::virtual_for(note),
        }
    }

    /// Virtual address of a note.
    #[must_use]
    pub fn virtual_for(note: &Note) -> Self {
        Self::Virtual {
            id: note.id().to_string(),
            title: note.title().to_string(),
        }
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Virtual { .. } => None,
        }
    }

    /// Parse a `note://<id>/<title>.note` string.
    ///
    /// Returns `None` for anything that is not a virtual address.
    #[must_use]
    pub fn parse_virtual(s: &str) -> Option<FileRef> {
        let rest = s.strip_prefix(VIRTUAL_SCHEME)?;
        let (id, name) = rest.split_once('/')?;
        let title = strip_note_ext(name).unwrap_or(name);
        Some(FileRef {
            id: (!id.is_empty()).then(|| id.to_string()),
            title: title.to_string(),
        })
    }
}

impl fmt::Display for NoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Virtual { id, title } => {
                let title = WHITESPACE.replace_all(title, " ");
                write!(f, "{VIRTUAL_SCHEME}{id}/{title}.{NOTE_EXT}")
            }
        }
    }
}

/// Note identity recovered from a file or a virtual address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Id from the header; `None` for a file that is not yet a note.
    pub id: Option<String>,
    /// Title from the header, or the file stem when the header has none.
    pub title: String,
}

/// Whether a string is a virtual note address.
#[must_use]
pub fn is_virtual_address(s: &str) -> bool {
    s.starts_with(VIRTUAL_SCHEME)
}

/// Make a title safe to use as a filename.
///
/// Keeps word characters, whitespace, `.` and `-`; collapses whitespace
/// runs to single spaces and trims.
#[must_use]
pub fn escape(title: &str) -> String {
    let kept = UNSAFE_CHARS.replace_all(title, "");
    WHITESPACE.replace_all(&kept, " ").trim().to_string()
}

/// File name for a note. Non-unique titles get the id appended.
#[must_use]
pub fn file_name(note: &Note, unique: bool) -> String {
    let base = escape(note.title());
    if unique {
        format!("{base}.{NOTE_EXT}")
    } else {
        format!("{base}:{}.{NOTE_EXT}", note.id())
    }
}

/// Path a note should be written to, or `None` if it must stay virtual.
#[must_use]
pub fn file_path(config: &SyncConfig, unique: bool, note: &Note) -> Option<PathBuf> {
    if note.trashed() {
        return None;
    }
    let dir = if note.archived() {
        config.archive_dir()?
    } else {
        config.sync_dir().to_path_buf()
    };
    Some(dir.join(file_name(note, unique)))
}

/// Resolve a file under the sync directory to its note identity.
///
/// Returns `Ok(None)` for paths outside the sync directory or without the
/// `.note` extension.
///
/// # Errors
///
/// Returns an error if the file header cannot be read.
pub fn address_from_path(config: &SyncConfig, path: &Path) -> std::io::Result<Option<FileRef>> {
    if !path.starts_with(config.sync_dir()) {
        return Ok(None);
    }
    let Some(stem) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(strip_note_ext)
    else {
        return Ok(None);
    };

    let header = read_header(path)?;
    let title = header.title.filter(|t| !t.is_empty()).unwrap_or_else(|| stem.to_string());
    Ok(Some(FileRef {
        id: header.id,
        title,
    }))
}

/// Strip a trailing `.note` (case-insensitive), which may be the whole name.
fn strip_note_ext(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(NOTE_EXT.len() + 1)?;
    let (stem, ext) = (name.get(..split)?, name.get(split..)?);
    (ext.starts_with('.') && ext[1..].eq_ignore_ascii_case(NOTE_EXT)).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_escape() {
        assert_eq!(escape("My Note\\/!@#$%^&*()💗"), "My Note");
        assert_eq!(escape("  a\t\tb  c "), "a b c");
        assert_eq!(escape("v1.2-final"), "v1.2-final");
        assert_eq!(escape("Ünïcödé"), "Ünïcödé");
    }

    #[test]
    fn test_file_name_disambiguates() {
        let note = Note::freeform("Foo", "");
        assert_eq!(file_name(&note, true), "Foo.note");
        assert_eq!(file_name(&note, false), format!("Foo:{}.note", note.id()));
    }

    #[test]
    fn test_file_path_placement() {
        let config = SyncConfig::new("/sync");
        let mut note = Note::freeform("Foo", "");
        assert_eq!(file_path(&config, true, &note), Some(PathBuf::from("/sync/Foo.note")));

        note.set_archived(true);
        assert_eq!(file_path(&config, true, &note), None);

        let archived = config.clone().with_archived(true);
        assert_eq!(
            file_path(&archived, true, &note),
            Some(PathBuf::from("/sync/archived/Foo.note"))
        );

        note.set_archived(false);
        note.set_trashed(true);
        assert_eq!(file_path(&archived, true, &note), None);
    }

    #[test]
    fn test_virtual_address_string() {
        let mut note = Note::new(NoteKind::Freeform);
        note.set_id("abc");
        note.set_title("Some   Title");
        let address = NoteAddress::virtual_for(&note);

        assert_eq!(address.to_string(), "note://abc/Some Title.note");
        assert!(address.is_virtual());
        assert!(address.path().is_none());
    }

    #[test]
    fn test_parse_virtual() {
        let parsed = NoteAddress::parse_virtual("note://abc/Some Title.note").unwrap();
        assert_eq!(parsed.id.as_deref(), Some("abc"));
        assert_eq!(parsed.title, "Some Title");

        let parsed = NoteAddress::parse_virtual("note:///Untitled.note").unwrap();
        assert!(parsed.id.is_none());

        assert!(NoteAddress::parse_virtual("/tmp/x.note").is_none());
    }

    #[test]
    fn test_strip_note_ext() {
        assert_eq!(strip_note_ext("Foo.note"), Some("Foo"));
        assert_eq!(strip_note_ext("Foo.NOTE"), Some("Foo"));
        assert_eq!(strip_note_ext(".note"), Some(""));
        assert_eq!(strip_note_ext("Foo.note.local"), None);
        assert_eq!(strip_note_ext("note"), None);
    }

    #[test]
    fn test_address_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::new(temp_dir.path());
        let path = config.sync_dir().join("Stem.note");
        fs::write(&path, "#\nid: xyz\n\nbody\n").unwrap();

        let file_ref = address_from_path(&config, &path).unwrap().unwrap();
        assert_eq!(file_ref.id.as_deref(), Some("xyz"));
        assert_eq!(file_ref.title, "Stem");

        let outside = Path::new("/elsewhere/Stem.note");
        assert!(address_from_path(&config, outside).unwrap().is_none());
    }
}
