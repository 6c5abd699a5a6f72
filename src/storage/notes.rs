//! Note store abstraction and in-memory implementation.
//!
//! The sync engine never talks to the remote service. It reads and mutates
//! notes through [`NoteStore`], and relies on the store to know which
//! titles are shared by several notes (those get the id appended to their
//! file name).

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::Note;
use crate::sync::address::escape;

/// Serialized remote state: the last known version token plus every note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque sync token from the remote store.
    #[serde(default)]
    pub version: Option<String>,
    pub notes: Vec<Note>,
}

/// What the sync engine needs from a note store.
pub trait NoteStore {
    /// Look up a note by id.
    fn get(&self, id: &str) -> Option<&Note>;

    /// Look up a note by id for mutation.
    fn get_mut(&mut self, id: &str) -> Option<&mut Note>;

    /// Insert a note, replacing any note with the same id.
    fn add(&mut self, note: Note);

    /// Every note, trashed ones included.
    fn notes(&self) -> Vec<&Note>;

    /// Whether the note's escaped title is unique within its partition
    /// (archived or active, trashed notes excluded).
    fn has_unique_title(&self, note: &Note) -> bool;

    /// Recompute title counters after titles or flags changed.
    fn recount_titles(&mut self);

    /// Capture the current state.
    fn dump(&self) -> Snapshot;

    /// Replace the current state with a snapshot.
    fn restore(&mut self, snapshot: &Snapshot);

    /// Merge notes fetched from the remote store.
    ///
    /// Returns the ids of notes that are new or whose `updated_at` changed.
    fn apply_remote(&mut self, version: Option<String>, notes: Vec<Note>) -> HashSet<String>;

    /// Whether any note has unpushed local changes.
    fn is_dirty(&self) -> bool {
        self.notes().iter().any(|note| note.is_dirty())
    }
}

/// Notes held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    notes: BTreeMap<String, Note>,
    version: Option<String>,
    titles: HashMap<String, usize>,
    archived_titles: HashMap<String, usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut store = Self::new();
        store.restore(snapshot);
        store
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Last remote version token.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Ids of notes with unpushed local changes.
    #[must_use]
    pub fn dirty_ids(&self) -> Vec<String> {
        self.notes
            .values()
            .filter(|note| note.is_dirty())
            .map(|note| note.id().to_string())
            .collect()
    }

    /// Resolve a note id from a unique prefix.
    #[must_use]
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&Note> {
        if let Some(note) = self.notes.get(prefix) {
            return vec![note];
        }
        self.notes
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, note)| note)
            .collect()
    }

    fn counters(&self, note: &Note) -> &HashMap<String, usize> {
        if note.archived() {
            &self.archived_titles
        } else {
            &self.titles
        }
    }
}

impl NoteStore for MemoryStore {
    fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    fn add(&mut self, note: Note) {
        self.notes.insert(note.id().to_string(), note);
        self.recount_titles();
    }

    fn notes(&self) -> Vec<&Note> {
        self.notes.values().collect()
    }

    fn has_unique_title(&self, note: &Note) -> bool {
        self.counters(note)
            .get(&escape(note.title()))
            .copied()
            .unwrap_or(0)
            < 2
    }

    fn recount_titles(&mut self) {
        self.titles.clear();
        self.archived_titles.clear();
        for note in self.notes.values().filter(|note| !note.trashed()) {
            let counters = if note.archived() {
                &mut self.archived_titles
            } else {
                &mut self.titles
            };
            *counters.entry(escape(note.title())).or_insert(0) += 1;
        }
    }

    fn dump(&self) -> Snapshot {
        Snapshot {
            version: self.version.clone(),
            notes: self.notes.values().cloned().collect(),
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.version.clone_from(&snapshot.version);
        self.notes = snapshot
            .notes
            .iter()
            .map(|note| (note.id().to_string(), note.clone()))
            .collect();
        self.recount_titles();
    }

    fn apply_remote(&mut self, version: Option<String>, notes: Vec<Note>) -> HashSet<String> {
        let mut updated = HashSet::new();
        for mut note in notes {
            note.mark_clean();
            let changed = self
                .notes
                .get(note.id())
                .is_none_or(|current| current.updated_at() != note.updated_at());
            if changed {
                updated.insert(note.id().to_string());
            }
            self.notes.insert(note.id().to_string(), note);
        }
        if version.is_some() {
            self.version = version;
        }
        self.recount_titles();
        updated
    }
}
