//! A view over one group of a grouped store.
//!
//! The group store owns no data: its list lives in the parent's results and its
//! selection is the parent's selection restricted to the group. Loading more
//! records of a group goes through the parent, so it is serialized with every
//! other fetch of that store.

use std::sync::Arc;

use crate::collection_store::{CollectionStore, StoreState};
use crate::config::StoreKind;
use crate::pagination::ListWindow;
use crate::selection::SelectionStatus;
use crate::store_error::StoreError;


pub struct SearchGroupStore<T> {
    parent: CollectionStore<T>,
    code: String,
}

impl<T> Clone for SearchGroupStore<T> {
    fn clone(&self) -> Self {
        Self { parent: self.parent.clone(), code: self.code.clone() }
    }
}

impl<T> std::fmt::Debug for SearchGroupStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchGroupStore").field("code", &self.code).finish_non_exhaustive()
    }
}

impl<T> SearchGroupStore<T> {
    pub(crate) fn new(parent: CollectionStore<T>, code: String) -> Self {
        Self { parent, code }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent(&self) -> &CollectionStore<T> {
        &self.parent
    }

    pub fn kind(&self) -> StoreKind {
        self.parent.kind()
    }

    fn read<R>(&self, read: impl FnOnce(&StoreState<T>) -> R) -> R {
        self.parent.read(read)
    }

    /// Whether the parent's current results contain this group.
    pub fn exists(&self) -> bool {
        self.read(|s| s.group(&self.code).is_some())
    }

    pub fn label(&self) -> String {
        self.read(|s| s.group(&self.code).map(|g| g.label.clone()).unwrap_or_default())
    }

    pub fn list(&self) -> Vec<Arc<T>> {
        self.read(|s| s.group(&self.code).map(|g| g.list.clone()).unwrap_or_default())
    }

    pub fn current_count(&self) -> usize {
        self.read(|s| s.group(&self.code).map(|g| g.list.len()).unwrap_or(0))
    }

    pub fn total_count(&self) -> usize {
        self.read(|s| {
            s.group(&self.code)
                .map(|g| usize::try_from(g.total_count).unwrap_or(usize::MAX).max(g.list.len()))
                .unwrap_or(0)
        })
    }

    pub fn has_more_to_load<K>(&self, window: &ListWindow<K>) -> bool {
        window.has_more_to_load(self.kind(), self.current_count(), self.total_count())
    }

    fn eligible(&self, state: &StoreState<T>) -> Vec<Arc<T>> {
        let config = self.parent.config();
        state
            .group(&self.code)
            .map(|g| g.list.iter().filter(|r| config.is_selectable(r)).cloned().collect())
            .unwrap_or_default()
    }

    /// Selection status over this group's eligible records only.
    pub fn selection_status(&self) -> SelectionStatus {
        self.read(|s| s.selection.status(&self.eligible(s)))
    }

    /// Selected records of this group, in selection order.
    pub fn selected_items(&self) -> Vec<Arc<T>> {
        self.read(|s| {
            let list = s.group(&self.code).map(|g| g.list.as_slice()).unwrap_or(&[]);
            s.selection.items().into_iter().filter(|r| list.iter().any(|l| Arc::ptr_eq(l, r))).collect()
        })
    }

    pub fn toggle(&self, record: &Arc<T>) -> bool {
        self.parent.toggle(record)
    }

    /// Like the parent's `toggle_all`, restricted to this group.
    pub fn toggle_all(&self) {
        self.parent.update(|state| {
            let eligible = self.eligible(state);
            state.selection.toggle_all(&eligible);
        })
    }

    /// Fetches the next page of this group.
    pub async fn load_more(&self) -> Result<(), StoreError> {
        self.parent.load_group_page(&self.code).await
    }
}
