//! Checklist body encoding and reconciliation.
//!
//! Reconciliation merges parsed file lines back into an existing item arena
//! so that items the user only moved, re-ticked or re-indented keep their
//! ids. Matching is by text; duplicate texts are consumed in display order.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Checklist, Note};

/// Gap between consecutive item sort values.
pub const ITEM_SORT_STEP: i64 = 1_000_000;

/// Indentation used for sub-items.
pub const INDENT: &str = "    ";

/// `[ ]`, `[x]` or `[-]` with optional leading whitespace.
pub static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*)\[([ x-])\]\s*(.*)$").expect("valid checklist item regex")
});

/// Rendered checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    Checked,
    /// Unchecked top-level item with at least one checked child.
    Partial,
}

impl CheckState {
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Unchecked => "[ ] ",
            Self::Checked => "[x] ",
            Self::Partial => "[-] ",
        }
    }
}

/// One body line, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedItem {
    text: String,
    checked: bool,
    indented: bool,
}

/// Render checklist items in display order.
#[must_use]
pub fn serialize_items(list: &Checklist) -> Vec<String> {
    list.ordered()
        .into_iter()
        .map(|item| {
            let prefix = if item.is_indented() { INDENT } else { "" };
            let state = if item.checked {
                CheckState::Checked
            } else if !item.is_indented() && list.has_checked_child(&item.id) {
                CheckState::Partial
            } else {
                CheckState::Unchecked
            };
            format!("{prefix}{}{}", state.marker(), item.text)
        })
        .collect()
}

/// Flip `[ ]` and `[x]` on a single line. Other lines are returned as-is.
#[must_use]
pub fn toggle_item(line: &str) -> String {
    let Some(caps) = ITEM_RE.captures(line) else {
        return line.to_string();
    };
    let next = if caps[2].eq_ignore_ascii_case("x") { " " } else { "x" };
    format!("{}[{next}] {}", &caps[1], &caps[3])
}

fn parse_item_line(line: &str) -> Option<ParsedItem> {
    if let Some(caps) = ITEM_RE.captures(line) {
        return Some(ParsedItem {
            indented: !caps[1].is_empty(),
            checked: caps[2].eq_ignore_ascii_case("x"),
            text: caps[3].to_string(),
        });
    }
    if line.trim().is_empty() {
        return None;
    }
    Some(ParsedItem {
        indented: line.starts_with(' '),
        checked: false,
        text: line.trim().to_string(),
    })
}

/// Existing items grouped by text, in display order.
struct TextIndex {
    by_text: HashMap<String, VecDeque<String>>,
    order: Vec<String>,
}

impl TextIndex {
    fn new(list: &Checklist) -> Self {
        let mut by_text: HashMap<String, VecDeque<String>> = HashMap::new();
        let mut order = Vec::new();
        for item in list.ordered() {
            by_text
                .entry(item.text.clone())
                .or_default()
                .push_back(item.id.clone());
            order.push(item.id.clone());
        }
        Self { by_text, order }
    }

    fn pop(&mut self, text: &str) -> Option<String> {
        self.by_text.get_mut(text)?.pop_front()
    }

    /// Ids never matched, in display order.
    fn into_unmatched(self) -> Vec<String> {
        let remaining: std::collections::HashSet<String> =
            self.by_text.into_values().flatten().collect();
        self.order
            .into_iter()
            .filter(|id| remaining.contains(id))
            .collect()
    }
}

/// Merge body lines into a checklist note.
///
/// Marks the note dirty when anything changed and returns whether it did.
/// Does nothing on freeform notes.
pub fn reconcile<S: AsRef<str>>(note: &mut Note, lines: &[S]) -> bool {
    let Some(list) = note.items_mut() else {
        return false;
    };
    let changed = reconcile_items(list, lines);
    if changed {
        note.touch();
    }
    changed
}

/// Merge body lines into an item arena, preserving identity where text
/// matches.
pub fn reconcile_items<S: AsRef<str>>(list: &mut Checklist, lines: &[S]) -> bool {
    let mut index = TextIndex::new(list);
    let mut parent: Option<String> = None;
    let mut emitted: Vec<String> = Vec::new();
    let mut last_sort: Option<i64> = None;
    let mut resort = false;
    let mut changed = false;

    for line in lines {
        let Some(parsed) = parse_item_line(line.as_ref()) else {
            continue;
        };
        let indented = parsed.indented && parent.is_some();

        let id = if let Some(id) = index.pop(&parsed.text) {
            id
        } else {
            changed = true;
            let sort = last_sort.map_or(0, |last| last - ITEM_SORT_STEP);
            list.add(&parsed.text, parsed.checked, sort)
        };

        let mut checked = parsed.checked;
        if indented {
            checked |= parent
                .as_deref()
                .and_then(|p| list.get(p))
                .is_some_and(|p| p.checked);
        }

        let sort = list.get(&id).map_or(0, |item| item.sort);
        if last_sort.is_some_and(|last| sort >= last) {
            resort = true;
        }
        last_sort = Some(sort);

        changed |= list.set_text(&id, &parsed.text);
        changed |= list.set_checked(&id, checked);

        match (indented, parent.as_deref()) {
            (true, Some(p)) => changed |= list.indent(&id, p),
            _ => changed |= list.dedent(&id),
        }

        if !indented {
            parent = Some(id.clone());
        }
        emitted.push(id);
    }

    for id in index.into_unmatched() {
        changed |= list.delete(&id);
    }

    if resort {
        let mut sort = 0;
        for id in &emitted {
            changed |= list.set_sort(id, sort);
            sort -= ITEM_SORT_STEP;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteKind;

    fn list_note(items: &[(&str, bool, i64)]) -> (Note, Vec<String>) {
        let mut note = Note::new(NoteKind::Checklist);
        let list = note.items_mut().unwrap();
        let ids = items
            .iter()
            .map(|(text, checked, sort)| list.add(text, *checked, *sort))
            .collect();
        note.mark_clean();
        (note, ids)
    }

    #[test]
    fn test_identity_preserved() {
        let (mut note, ids) = list_note(&[("A", false, 0), ("B", true, -ITEM_SORT_STEP)]);

        let changed = reconcile(&mut note, &["[ ] A", "[x] B"]);

        assert!(!changed);
        assert!(!note.is_dirty());
        let list = note.items().unwrap();
        let order: Vec<&str> = list.ordered().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec![ids[0].as_str(), ids[1].as_str()]);
    }

    #[test]
    fn test_new_item_sorted_after_previous() {
        let (mut note, ids) = list_note(&[("A", false, 5)]);

        assert!(reconcile(&mut note, &["[ ] A", "[ ] C"]));

        let list = note.items().unwrap();
        assert_eq!(list.len(), 2);
        let ordered = list.ordered();
        assert_eq!(ordered[0].id, ids[0]);
        assert_ne!(ordered[1].id, ids[0]);
        assert_eq!(ordered[1].text, "C");
        assert_eq!(ordered[1].sort, 5 - ITEM_SORT_STEP);
        assert!(note.is_dirty());
    }

    #[test]
    fn test_missing_item_deleted() {
        let (mut note, ids) = list_note(&[("A", false, 0), ("B", false, -ITEM_SORT_STEP)]);

        assert!(reconcile(&mut note, &["[ ] A"]));

        let list = note.items().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.get(&ids[1]).is_none());
        assert_eq!(list.deleted_ids(), &[ids[1].clone()]);
    }

    #[test]
    fn test_reorder_triggers_resort() {
        let (mut note, ids) = list_note(&[("A", false, 0), ("B", false, -ITEM_SORT_STEP)]);

        assert!(reconcile(&mut note, &["[ ] B", "[ ] A"]));

        let list = note.items().unwrap();
        assert_eq!(list.get(&ids[1]).unwrap().sort, 0);
        assert_eq!(list.get(&ids[0]).unwrap().sort, -ITEM_SORT_STEP);
        assert_eq!(list.ordered()[0].text, "B");
    }

    #[test]
    fn test_duplicate_texts_matched_in_order() {
        let (mut note, ids) = list_note(&[("dup", false, 0), ("dup", true, -ITEM_SORT_STEP)]);

        assert!(!reconcile(&mut note, &["[ ] dup", "[x] dup"]));

        let list = note.items().unwrap();
        assert!(!list.get(&ids[0]).unwrap().checked);
        assert!(list.get(&ids[1]).unwrap().checked);
    }

    #[test]
    fn test_indent_and_parent_checked() {
        let (mut note, ids) = list_note(&[("A", true, 0), ("B", false, -ITEM_SORT_STEP)]);

        assert!(reconcile(&mut note, &["[x] A", "    [ ] B"]));

        let b = note.items().unwrap().get(&ids[1]).unwrap();
        assert_eq!(b.parent.as_deref(), Some(ids[0].as_str()));
        assert!(b.checked);
    }

    #[test]
    fn test_leading_indent_without_parent_is_flattened() {
        let (mut note, _) = list_note(&[]);

        reconcile(&mut note, &["    [ ] orphan"]);

        let list = note.items().unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.ordered()[0].is_indented());
    }

    #[test]
    fn test_plain_lines_become_items() {
        let (mut note, _) = list_note(&[]);

        reconcile(&mut note, &["first", "", "  second  "]);

        let list = note.items().unwrap();
        let ordered = list.ordered();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].text, "first");
        assert_eq!(ordered[1].text, "second");
        assert!(ordered[1].is_indented());
    }

    #[test]
    fn test_dedent() {
        let (mut note, ids) = list_note(&[("A", false, 0), ("B", false, -ITEM_SORT_STEP)]);
        reconcile(&mut note, &["[ ] A", "    [ ] B"]);
        note.mark_clean();

        assert!(reconcile(&mut note, &["[ ] A", "[ ] B"]));
        assert!(note.items().unwrap().get(&ids[1]).unwrap().parent.is_none());
    }

    #[test]
    fn test_serialize_partial_state() {
        let (mut note, ids) = list_note(&[("A", false, 0), ("B", true, -ITEM_SORT_STEP)]);
        note.items_mut().unwrap().indent(&ids[1], &ids[0]);

        let lines = serialize_items(note.items().unwrap());
        assert_eq!(lines, vec!["[-] A", "    [x] B"]);
    }

    #[test]
    fn test_partial_marker_parses_unchecked() {
        let parsed = parse_item_line("[-] A").unwrap();
        assert!(!parsed.checked);
        let parsed = parse_item_line("  [X] B").unwrap();
        assert!(parsed.checked);
        assert!(parsed.indented);
    }

    #[test]
    fn test_toggle_item() {
        assert_eq!(toggle_item("[ ] milk"), "[x] milk");
        assert_eq!(toggle_item("    [X]   eggs"), "    [ ] eggs");
        assert_eq!(toggle_item("not an item"), "not an item");
    }
}
