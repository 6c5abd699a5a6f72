//! Checklist item arena.
//!
//! Items are stored by id. Hierarchy is a single level: an indented item
//! points at a non-indented parent through `parent`. Display order is
//! derived from `sort` (descending = earlier), never stored separately.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::generate_id;

/// A single checklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Stable identifier
    pub id: String,

    /// Item text (single line)
    pub text: String,

    /// Whether the item is ticked
    pub checked: bool,

    /// Parent item id; `Some` means the item is indented
    #[serde(default)]
    pub parent: Option<String>,

    /// Position; higher sorts earlier
    pub sort: i64,
}

impl ChecklistItem {
    /// Whether this item is rendered as a sub-item.
    #[must_use]
    pub const fn is_indented(&self) -> bool {
        self.parent.is_some()
    }
}

/// Items of a checklist note, indexed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    items: BTreeMap<String, ChecklistItem>,

    /// Ids of removed items, kept so a transport can push the deletions.
    #[serde(default)]
    deleted: Vec<String>,
}

impl Checklist {
    /// Create an empty checklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new top-level item and return its id.
    pub fn add(&mut self, text: &str, checked: bool, sort: i64) -> String {
        let id = generate_id();
        self.items.insert(
            id.clone(),
            ChecklistItem {
                id: id.clone(),
                text: text.to_string(),
                checked,
                parent: None,
                sort,
            },
        );
        id
    }

    /// Insert a fully formed item, replacing any item with the same id.
    pub fn insert(&mut self, item: ChecklistItem) {
        self.items.insert(item.id.clone(), item);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChecklistItem> {
        self.items.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of items removed since the checklist was created or restored.
    #[must_use]
    pub fn deleted_ids(&self) -> &[String] {
        &self.deleted
    }

    /// Items in display order.
    ///
    /// Top-level items come by descending sort (ties broken by id), each
    /// immediately followed by its children in the same order. A child
    /// whose parent no longer exists is treated as top-level.
    #[must_use]
    pub fn ordered(&self) -> Vec<&ChecklistItem> {
        let mut top: Vec<&ChecklistItem> = Vec::new();
        let mut children: HashMap<&str, Vec<&ChecklistItem>> = HashMap::new();

        for item in self.items.values() {
            match item.parent.as_deref() {
                Some(parent) if self.items.contains_key(parent) => {
                    children.entry(parent).or_default().push(item);
                }
                _ => top.push(item),
            }
        }

        top.sort_by_key(|item| (Reverse(item.sort), item.id.as_str()));

        let mut ordered = Vec::with_capacity(self.items.len());
        for item in top {
            ordered.push(item);
            if let Some(mut subitems) = children.remove(item.id.as_str()) {
                subitems.sort_by_key(|child| (Reverse(child.sort), child.id.as_str()));
                ordered.extend(subitems);
            }
        }
        ordered
    }

    /// Children of an item in display order.
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&ChecklistItem> {
        let mut subitems: Vec<&ChecklistItem> = self
            .items
            .values()
            .filter(|item| item.parent.as_deref() == Some(id))
            .collect();
        subitems.sort_by_key(|child| (Reverse(child.sort), child.id.as_str()));
        subitems
    }

    /// Whether any child of the item is checked.
    #[must_use]
    pub fn has_checked_child(&self, id: &str) -> bool {
        self.items
            .values()
            .any(|item| item.checked && item.parent.as_deref() == Some(id))
    }

    /// Set item text. Returns whether anything changed.
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        match self.items.get_mut(id) {
            Some(item) if item.text != text => {
                item.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// Set the checked flag. Returns whether anything changed.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
        match self.items.get_mut(id) {
            Some(item) if item.checked != checked => {
                item.checked = checked;
                true
            }
            _ => false,
        }
    }

    /// Set the sort position. Returns whether anything changed.
    pub fn set_sort(&mut self, id: &str, sort: i64) -> bool {
        match self.items.get_mut(id) {
            Some(item) if item.sort != sort => {
                item.sort = sort;
                true
            }
            _ => false,
        }
    }

    /// Make `id` a child of `parent`.
    ///
    /// The item's own children are detached first so nesting never exceeds
    /// one level. The parent must exist and be top-level.
    pub fn indent(&mut self, id: &str, parent: &str) -> bool {
        if id == parent || !self.items.contains_key(id) {
            return false;
        }
        match self.items.get(parent) {
            Some(target) if !target.is_indented() => {}
            _ => return false,
        }
        if self.items.get(id).and_then(|item| item.parent.as_deref()) == Some(parent) {
            return false;
        }

        self.detach_children(id);
        if let Some(item) = self.items.get_mut(id) {
            item.parent = Some(parent.to_string());
        }
        true
    }

    /// Move `id` back to the top level.
    pub fn dedent(&mut self, id: &str) -> bool {
        match self.items.get_mut(id) {
            Some(item) if item.parent.is_some() => {
                item.parent = None;
                true
            }
            _ => false,
        }
    }

    /// Remove an item. Its children become top-level.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.items.remove(id).is_none() {
            return false;
        }
        self.detach_children(id);
        self.deleted.push(id.to_string());
        true
    }

    fn detach_children(&mut self, id: &str) {
        for item in self.items.values_mut() {
            if item.parent.as_deref() == Some(id) {
                item.parent = None;
            }
        }
    }
}
