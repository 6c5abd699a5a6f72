//! List cached notes.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{load_snapshot, short_id};
use crate::error::Result;
use crate::model::Note;

#[derive(Serialize)]
struct NoteRow<'a> {
    id: &'a str,
    title: &'a str,
    kind: &'a str,
    labels: &'a [String],
    pinned: bool,
    archived: bool,
    trashed: bool,
    dirty: bool,
    updated_at: i64,
}

impl<'a> From<&'a Note> for NoteRow<'a> {
    fn from(note: &'a Note) -> Self {
        Self {
            id: note.id(),
            title: note.title(),
            kind: note.kind().as_str(),
            labels: note.labels(),
            pinned: note.pinned(),
            archived: note.archived(),
            trashed: note.trashed(),
            dirty: note.is_dirty(),
            updated_at: note.updated_at(),
        }
    }
}

/// Execute the list command.
///
/// Pinned notes come first, then by title.
///
/// # Errors
///
/// Returns `Error::NotInitialized` without a cache.
pub fn execute(cache: Option<&Path>, trashed: bool, json: bool) -> Result<()> {
    let snapshot = load_snapshot(cache)?;
    let mut notes: Vec<&Note> = snapshot
        .notes
        .iter()
        .filter(|note| trashed || !note.trashed())
        .collect();
    notes.sort_by(|a, b| {
        b.pinned()
            .cmp(&a.pinned())
            .then_with(|| a.title().to_lowercase().cmp(&b.title().to_lowercase()))
            .then_with(|| a.id().cmp(b.id()))
    });

    if json {
        let rows: Vec<NoteRow<'_>> = notes.into_iter().map(NoteRow::from).collect();
        println!("{}", serde_json::to_string(&rows)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes cached.");
        return Ok(());
    }

    for note in notes {
        let title = if note.title().is_empty() {
            "(untitled)".dimmed().to_string()
        } else if note.pinned() {
            note.title().bold().to_string()
        } else {
            note.title().to_string()
        };
        let mut flags = Vec::new();
        if note.archived() {
            flags.push("archived");
        }
        if note.trashed() {
            flags.push("trashed");
        }
        if note.is_dirty() {
            flags.push("modified");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!(
            "{}  {:<9}  {}{}",
            short_id(note.id()).dimmed(),
            note.kind().as_str(),
            title,
            flags.yellow()
        );
    }

    Ok(())
}
