//! Note model.
//!
//! A note carries remote-owned metadata (labels, color, flags, sort) and a
//! body that is either freeform text or a checklist. Every setter compares
//! before writing; a real change marks the note dirty and bumps
//! `updated_at` so the next push picks it up.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::checklist::Checklist;
use crate::model::generate_id;

/// Note background color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    DarkBlue,
    Purple,
    Pink,
    Brown,
    Gray,
}

impl Color {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Teal => "teal",
            Self::Blue => "blue",
            Self::DarkBlue => "dark_blue",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Brown => "brown",
            Self::Gray => "gray",
        }
    }

    /// Parse from string. Unknown names map to the default color.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "red" => Self::Red,
            "orange" => Self::Orange,
            "yellow" => Self::Yellow,
            "green" => Self::Green,
            "teal" => Self::Teal,
            "blue" => Self::Blue,
            "dark_blue" | "darkblue" => Self::DarkBlue,
            "purple" => Self::Purple,
            "pink" => Self::Pink,
            "brown" => Self::Brown,
            "gray" | "grey" => Self::Gray,
            _ => Self::Default,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which body variant a note has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Freeform,
    Checklist,
}

impl NoteKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Freeform => "freeform",
            Self::Checklist => "checklist",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Note content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum NoteBody {
    Text(String),
    Checklist(Checklist),
}

impl NoteBody {
    /// Empty body of the given kind.
    #[must_use]
    pub fn empty(kind: NoteKind) -> Self {
        match kind {
            NoteKind::Freeform => Self::Text(String::new()),
            NoteKind::Checklist => Self::Checklist(Checklist::new()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> NoteKind {
        match self {
            Self::Text(_) => NoteKind::Freeform,
            Self::Checklist(_) => NoteKind::Checklist,
        }
    }
}

/// A note mirrored between the remote store and disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    id: String,
    title: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    color: Color,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    trashed: bool,
    #[serde(default)]
    sort: i64,
    /// Last modification time (Unix milliseconds)
    updated_at: i64,
    /// Local changes not yet pushed
    #[serde(default)]
    dirty: bool,
    body: NoteBody,
}

impl Note {
    /// Create a new, locally authored note.
    ///
    /// The note gets a fresh id and starts dirty so it is pushed on the
    /// next sync.
    #[must_use]
    pub fn new(kind: NoteKind) -> Self {
        Self {
            id: generate_id(),
            title: String::new(),
            labels: Vec::new(),
            color: Color::Default,
            pinned: false,
            archived: false,
            trashed: false,
            sort: 0,
            updated_at: now_millis(),
            dirty: true,
            body: NoteBody::empty(kind),
        }
    }

    /// Build a clean note as delivered by the remote store.
    #[must_use]
    pub fn from_remote(id: impl Into<String>, title: &str, body: NoteBody, updated_at: i64) -> Self {
        Self {
            id: id.into(),
            title: normalize_title(title),
            labels: Vec::new(),
            color: Color::Default,
            pinned: false,
            archived: false,
            trashed: false,
            sort: 0,
            updated_at,
            dirty: false,
            body,
        }
    }

    /// Convenience constructor for a freeform note.
    #[must_use]
    pub fn freeform(title: &str, text: &str) -> Self {
        let mut note = Self::new(NoteKind::Freeform);
        note.set_title(title);
        note.set_text(text);
        note
    }

    /// Convenience constructor for an empty checklist note.
    #[must_use]
    pub fn checklist(title: &str) -> Self {
        let mut note = Self::new(NoteKind::Checklist);
        note.set_title(title);
        note
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub const fn pinned(&self) -> bool {
        self.pinned
    }

    #[must_use]
    pub const fn archived(&self) -> bool {
        self.archived
    }

    #[must_use]
    pub const fn trashed(&self) -> bool {
        self.trashed
    }

    #[must_use]
    pub const fn sort(&self) -> i64 {
        self.sort
    }

    #[must_use]
    pub const fn updated_at(&self) -> i64 {
        self.updated_at
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn kind(&self) -> NoteKind {
        self.body.kind()
    }

    #[must_use]
    pub const fn body(&self) -> &NoteBody {
        &self.body
    }

    /// Text of a freeform note.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            NoteBody::Text(text) => Some(text),
            NoteBody::Checklist(_) => None,
        }
    }

    /// Items of a checklist note.
    #[must_use]
    pub const fn items(&self) -> Option<&Checklist> {
        match &self.body {
            NoteBody::Checklist(list) => Some(list),
            NoteBody::Text(_) => None,
        }
    }

    /// Mutable access to checklist items.
    ///
    /// Does not mark the note dirty; callers that change items must call
    /// [`Note::touch`].
    pub fn items_mut(&mut self) -> Option<&mut Checklist> {
        match &mut self.body {
            NoteBody::Checklist(list) => Some(list),
            NoteBody::Text(_) => None,
        }
    }

    /// Record a local modification.
    pub fn touch(&mut self) {
        self.dirty = true;
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    /// Clear the dirty flag after a successful push.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Replace the id.
    ///
    /// Identity is not content, so this does not touch the note.
    pub fn set_id(&mut self, id: &str) -> bool {
        if self.id == id {
            return false;
        }
        self.id = id.to_string();
        true
    }

    /// Set the title, collapsing newlines and trimming whitespace.
    pub fn set_title(&mut self, title: &str) -> bool {
        let title = normalize_title(title);
        if self.title == title {
            return false;
        }
        self.title = title;
        self.touch();
        true
    }

    /// Set freeform text. No-op on checklist notes.
    pub fn set_text(&mut self, text: &str) -> bool {
        match &mut self.body {
            NoteBody::Text(current) if current != text => {
                *current = text.to_string();
            }
            _ => return false,
        }
        self.touch();
        true
    }

    /// Replace the label set.
    ///
    /// Labels behave as a set: order and duplicates in the input are
    /// irrelevant to change detection.
    pub fn set_labels(&mut self, labels: Vec<String>) -> bool {
        let mut unique: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }

        let same = unique.len() == self.labels.len()
            && unique.iter().all(|label| self.labels.contains(label));
        if same {
            return false;
        }
        self.labels = unique;
        self.touch();
        true
    }

    /// Add one label. Returns whether it was new.
    pub fn add_label(&mut self, label: &str) -> bool {
        if self.labels.iter().any(|l| l == label) {
            return false;
        }
        self.labels.push(label.to_string());
        self.touch();
        true
    }

    pub fn set_color(&mut self, color: Color) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        self.touch();
        true
    }

    pub fn set_pinned(&mut self, pinned: bool) -> bool {
        if self.pinned == pinned {
            return false;
        }
        self.pinned = pinned;
        self.touch();
        true
    }

    pub fn set_archived(&mut self, archived: bool) -> bool {
        if self.archived == archived {
            return false;
        }
        self.archived = archived;
        self.touch();
        true
    }

    pub fn set_trashed(&mut self, trashed: bool) -> bool {
        if self.trashed == trashed {
            return false;
        }
        self.trashed = trashed;
        self.touch();
        true
    }

    pub fn set_sort(&mut self, sort: i64) -> bool {
        if self.sort == sort {
            return false;
        }
        self.sort = sort;
        self.touch();
        true
    }
}

/// Collapse a title to a single trimmed line.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title.replace(['\r', '\n'], " ").trim().to_string()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
