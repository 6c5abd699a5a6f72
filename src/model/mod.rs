//! Data models for notesync.
//!
//! This module contains the domain models:
//! - Note (freeform or checklist body)
//! - Checklist item arena

pub mod checklist;
pub mod note;

pub use checklist::{Checklist, ChecklistItem};
pub use note::{normalize_title, Color, Note, NoteBody, NoteKind};

/// Generate a locally unique id for notes and checklist items.
#[must_use]
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
