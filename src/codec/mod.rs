//! Text codec: note ⇄ file lines.
//!
//! A note file is a small header followed by the body:
//!
//! ```text
//! # Groceries
//! id: 3f1c9a...
//! labels: home, "errands, weekly"
//!
//! [ ] milk
//!     [x] oat
//! [x] bread
//! ```
//!
//! Parsing is tolerant: any missing header line is simply absent, and any
//! body line of a checklist becomes an item. `parse(serialize(note))`
//! never changes the note.

mod checklist;
mod header;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::model::{Note, NoteBody, NoteKind};

pub use checklist::{
    reconcile, reconcile_items, serialize_items, toggle_item, CheckState, INDENT, ITEM_RE,
    ITEM_SORT_STEP,
};
pub use header::{
    format_header, format_labels, parse_header, parse_labels, parse_meta, read_header,
    write_file_header, Header, ParsedHeader,
};

/// Lines inspected when guessing whether a new file is a checklist.
const KIND_PROBE_LINES: usize = 8;

/// Serialize a note to file lines (without trailing newlines).
#[must_use]
pub fn serialize(note: &Note) -> Vec<String> {
    let mut lines = format_header(note);
    match note.body() {
        NoteBody::Text(text) => lines.extend(text.split('\n').map(str::to_string)),
        NoteBody::Checklist(list) => lines.extend(serialize_items(list)),
    }
    lines
}

/// Parse file lines into an existing note.
///
/// Returns whether anything changed; changed notes are marked dirty. A
/// missing `#` line leaves the title untouched and a missing `id:` line
/// leaves the id untouched. A missing `labels:` line clears the labels.
pub fn parse<S: AsRef<str>>(lines: &[S], note: &mut Note) -> bool {
    let parsed = parse_header(lines);
    let mut changed = false;

    if let Some(title) = parsed.header.title.as_deref() {
        changed |= note.set_title(title);
    }
    if let Some(id) = parsed.header.id.as_deref() {
        changed |= note.set_id(id);
    }
    changed |= note.set_labels(parsed.labels);

    let body = lines.get(parsed.body_start..).unwrap_or_default();
    match note.kind() {
        NoteKind::Freeform => {
            let text = body
                .iter()
                .map(|line| line.as_ref())
                .collect::<Vec<&str>>()
                .join("\n");
            changed |= note.set_text(&text);
        }
        NoteKind::Checklist => changed |= reconcile(note, body),
    }

    changed
}

/// Read every line of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid UTF-8.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}

/// Read at most `limit` lines of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid UTF-8.
pub fn read_lines_limit(path: &Path, limit: usize) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().take(limit).collect()
}

/// Guess the kind of a new note from its first lines.
#[must_use]
pub fn detect_kind<S: AsRef<str>>(lines: &[S]) -> NoteKind {
    let is_list = lines
        .iter()
        .take(KIND_PROBE_LINES)
        .any(|line| ITEM_RE.is_match(line.as_ref()));
    if is_list {
        NoteKind::Checklist
    } else {
        NoteKind::Freeform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;

    fn sample_freeform() -> Note {
        let mut note = Note::freeform("Shopping", "line one\n\nline three");
        note.set_labels(vec!["home".into(), "a, b".into()]);
        note.set_color(Color::Yellow);
        note.mark_clean();
        note
    }

    fn sample_checklist() -> Note {
        let mut note = Note::checklist("Todo");
        let list = note.items_mut().unwrap();
        let a = list.add("parent", false, 0);
        let b = list.add("child", true, -ITEM_SORT_STEP);
        list.add("other", false, -2 * ITEM_SORT_STEP);
        list.indent(&b, &a);
        note.mark_clean();
        note
    }

    #[test]
    fn test_serialize_freeform() {
        let note = sample_freeform();
        let lines = serialize(&note);
        assert_eq!(lines[0], "# Shopping");
        assert_eq!(lines[1], format!("id: {}", note.id()));
        assert_eq!(lines[2], r#"labels: home, "a, b""#);
        assert_eq!(lines[3], "");
        assert_eq!(&lines[4..], &["line one", "", "line three"]);
    }

    #[test]
    fn test_serialize_no_labels_line() {
        let note = Note::freeform("T", "x");
        let lines = serialize(&note);
        assert_eq!(lines.len(), 4);
        assert!(!lines.iter().any(|l| l.starts_with("labels:")));
    }

    #[test]
    fn test_roundtrip_freeform_unchanged() {
        let mut note = sample_freeform();
        let before = note.clone();
        let lines = serialize(&note);

        assert!(!parse(&lines, &mut note));
        assert_eq!(note, before);
    }

    #[test]
    fn test_roundtrip_checklist_unchanged() {
        let mut note = sample_checklist();
        let before = note.clone();
        let lines = serialize(&note);

        assert_eq!(&lines[3..], &["[-] parent", "    [x] child", "[ ] other"]);
        assert!(!parse(&lines, &mut note));
        assert_eq!(note, before);
    }

    #[test]
    fn test_empty_title_roundtrip() {
        let mut note = Note::freeform("", "body");
        note.mark_clean();
        let lines = serialize(&note);
        assert_eq!(lines[0], "# ");
        assert!(!parse(&lines, &mut note));
    }

    #[test]
    fn test_parse_missing_header_keeps_identity() {
        let mut note = sample_freeform();
        let id = note.id().to_string();

        assert!(parse(&["new body"], &mut note));
        assert_eq!(note.id(), id);
        assert_eq!(note.title(), "Shopping");
        assert!(note.labels().is_empty());
        assert_eq!(note.text(), Some("new body"));
        assert!(note.is_dirty());
    }

    #[test]
    fn test_parse_updates_title() {
        let mut note = sample_freeform();
        let lines = vec!["# Renamed".to_string(), format!("id: {}", note.id()), String::new()];

        assert!(parse(&lines, &mut note));
        assert_eq!(note.title(), "Renamed");
        assert_eq!(note.text(), Some(""));
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind(&["# t", "", "[ ] a"]), NoteKind::Checklist);
        assert_eq!(detect_kind(&["# t", "", "plain"]), NoteKind::Freeform);

        let mut late = vec!["x"; 8];
        late.push("[ ] too late");
        assert_eq!(detect_kind(&late), NoteKind::Freeform);
    }
}
