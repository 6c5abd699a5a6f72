//! Show a cached note as it would be written to disk.

use std::path::Path;

use serde::Serialize;

use crate::cli::commands::load_snapshot;
use crate::codec;
use crate::error::{Error, Result};
use crate::model::Note;
use crate::storage::MemoryStore;

#[derive(Serialize)]
struct ShowOutput<'a> {
    note: &'a Note,
    lines: Vec<String>,
}

/// Execute the show command.
///
/// # Errors
///
/// Returns `Error::NoteNotFound` (with title matches as suggestions when
/// there are any) or `Error::AmbiguousId` if the prefix matches several
/// notes.
pub fn execute(cache: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let store = MemoryStore::from_snapshot(&load_snapshot(cache)?);
    let note = resolve(&store, id)?;
    let lines = codec::serialize(note);

    if json {
        let output = ShowOutput { note, lines };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn resolve<'a>(store: &'a MemoryStore, id: &str) -> Result<&'a Note> {
    let matches = store.find_by_prefix(id);
    match matches.as_slice() {
        [note] => Ok(*note),
        [] => {
            let needle = id.to_lowercase();
            let similar: Vec<String> = store
                .find_by_prefix("")
                .into_iter()
                .filter(|note| note.title().to_lowercase().contains(&needle))
                .map(|note| note.id().to_string())
                .take(5)
                .collect();
            if similar.is_empty() {
                Err(Error::NoteNotFound { id: id.to_string() })
            } else {
                Err(Error::NoteNotFoundSimilar {
                    id: id.to_string(),
                    similar,
                })
            }
        }
        _ => Err(Error::AmbiguousId {
            id: id.to_string(),
            matches: matches.iter().map(|note| note.id().to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteBody;
    use crate::storage::NoteStore;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add(Note::from_remote("abc1", "Groceries", NoteBody::Text(String::new()), 1));
        store.add(Note::from_remote("abc2", "Trip", NoteBody::Text(String::new()), 1));
        store.add(Note::from_remote("xyz", "Work", NoteBody::Text(String::new()), 1));
        store
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let store = store();
        assert_eq!(resolve(&store, "xy").unwrap().id(), "xyz");
        assert_eq!(resolve(&store, "abc2").unwrap().title(), "Trip");
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let store = store();
        let err = resolve(&store, "abc").unwrap_err();
        assert!(matches!(err, Error::AmbiguousId { matches, .. } if matches.len() == 2));
    }

    #[test]
    fn test_resolve_suggests_by_title() {
        let store = store();
        let err = resolve(&store, "grocer").unwrap_err();
        assert!(matches!(err, Error::NoteNotFoundSimilar { similar, .. } if similar == ["abc1"]));

        let err = resolve(&store, "nothing").unwrap_err();
        assert!(matches!(err, Error::NoteNotFound { .. }));
    }
}
