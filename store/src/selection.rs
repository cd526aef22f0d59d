//! Selection of materialized records, by identity.
//!
//! Selection is independent of any pagination window: a selected record stays
//! selected when it scrolls out of view. "Select all" only reaches records that
//! were actually fetched, never the server-side total.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexSet;


/// A materialized record compared by pointer identity.
pub struct RecordRef<T>(pub Arc<T>);

impl<T> RecordRef<T> {
    /// Identity key of a materialized record.
    pub fn identity(record: &Arc<T>) -> usize {
        Arc::as_ptr(record) as usize
    }
}

impl<T> Clone for RecordRef<T> {
    fn clone(&self) -> Self {
        RecordRef(self.0.clone())
    }
}

impl<T> PartialEq for RecordRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for RecordRef<T> {}

impl<T> Hash for RecordRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::identity(&self.0).hash(state);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RecordRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStatus {
    #[default]
    None,
    Partial,
    Selected,
}

#[derive(Debug)]
pub struct SelectionTracker<T> {
    selected: IndexSet<RecordRef<T>>,
}

impl<T> Clone for SelectionTracker<T> {
    fn clone(&self) -> Self {
        Self { selected: self.selected.clone() }
    }
}

impl<T> Default for SelectionTracker<T> {
    fn default() -> Self {
        Self { selected: IndexSet::new() }
    }
}

impl<T> SelectionTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, record: &Arc<T>) -> bool {
        self.selected.contains(&RecordRef(record.clone()))
    }

    /// Selected records, in selection order.
    pub fn items(&self) -> Vec<Arc<T>> {
        self.selected.iter().map(|r| r.0.clone()).collect()
    }

    /// Adds the record if absent, removes it otherwise. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, record: &Arc<T>) -> bool {
        let key = RecordRef(record.clone());
        if self.selected.shift_remove(&key) {
            return false;
        }
        self.selected.insert(key);
        true
    }

    /// Tri-state over the given eligible records.
    pub fn status(&self, eligible: &[Arc<T>]) -> SelectionStatus {
        let selected = eligible.iter().filter(|r| self.contains(r)).count();
        if selected == 0 {
            SelectionStatus::None
        } else if selected == eligible.len() {
            SelectionStatus::Selected
        } else {
            SelectionStatus::Partial
        }
    }

    /// Deselects the eligible records if any of them is selected, selects them
    /// all otherwise.
    pub fn toggle_all(&mut self, eligible: &[Arc<T>]) {
        if self.status(eligible) != SelectionStatus::None {
            for record in eligible.iter() {
                self.selected.shift_remove(&RecordRef(record.clone()));
            }
            return;
        }
        for record in eligible.iter() {
            self.selected.insert(RecordRef(record.clone()));
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Keeps only the selected records for which `keep` is true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Arc<T>) -> bool) {
        self.selected.retain(|r| keep(&r.0));
    }
}
