//! Backup notes for conflicting edits.
//!
//! When a file was edited locally and the same note changed remotely, the
//! remote version is preserved as a new trashed note and the file wins.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{Checklist, ChecklistItem, Note, NoteBody};

/// Title of a backup made on `date`.
#[must_use]
pub fn backup_title(title: &str, date: NaiveDate) -> String {
    format!("[Backup {}] {title}", date.format("%Y-%m-%d"))
}

/// Copy a note into a new trashed, dirty note.
///
/// Text, labels and color are copied. Checklist items get fresh ids with
/// the same text, checked state and sort; children stay under the copy of
/// their parent.
#[must_use]
pub fn backup_note(note: &Note, date: NaiveDate) -> Note {
    let mut backup = Note::new(note.kind());
    backup.set_title(&backup_title(note.title(), date));
    backup.set_labels(note.labels().to_vec());
    backup.set_color(note.color());
    backup.set_trashed(true);

    match note.body() {
        NoteBody::Text(text) => {
            backup.set_text(text);
        }
        NoteBody::Checklist(source) => {
            if let Some(target) = backup.items_mut() {
                let mut new_ids: HashMap<&str, String> = HashMap::new();
                let ordered = source.ordered();
                for item in &ordered {
                    let id = target.add(&item.text, item.checked, item.sort);
                    new_ids.insert(item.id.as_str(), id);
                }
                for item in &ordered {
                    copy_parent(target, item, &new_ids);
                }
            }
            backup.touch();
        }
    }

    backup
}

fn copy_parent(
    target: &mut Checklist,
    item: &ChecklistItem,
    new_ids: &HashMap<&str, String>,
) {
    let Some(parent) = item.parent.as_deref().and_then(|p| new_ids.get(p)) else {
        return;
    };
    if let Some(id) = new_ids.get(item.id.as_str()) {
        target.indent(id, parent);
    }
}
