//! Binds a search-bar text field to a store's query and criteria.

use std::collections::BTreeSet;

use crate::collection_store::{CollectionStore, StoreProperties};
use crate::criteria_tokenizer;


#[derive(Debug, Clone, Default)]
pub struct CriteriaInput {
    known_keys: BTreeSet<String>,
    typed_order: Vec<String>,
}

impl CriteriaInput {
    pub fn new<K: Into<String>>(known_keys: impl IntoIterator<Item = K>) -> Self {
        Self { known_keys: known_keys.into_iter().map(Into::into).collect(), typed_order: Vec::new() }
    }

    pub fn known_keys(&self) -> &BTreeSet<String> {
        &self.known_keys
    }

    /// Keys typed in the text field, in typing order.
    pub fn typed_order(&self) -> &[String] {
        &self.typed_order
    }

    /// Pushes what the user typed into the store. Does not search.
    pub fn input<T>(&mut self, raw: &str, store: &CollectionStore<T>) {
        let parsed = criteria_tokenizer::parse(raw, &self.known_keys);
        let criteria = criteria_tokenizer::apply_criteria(&parsed, &self.known_keys, &store.criteria());
        self.typed_order = parsed.typed_keys();
        store.set_properties(StoreProperties {
            query: Some(parsed.residual_query),
            criteria: Some(criteria),
            ..Default::default()
        });
    }

    /// The text the field should show for the store's current state.
    pub fn display_text<T>(&self, store: &CollectionStore<T>) -> String {
        store.read(|s| criteria_tokenizer::render(&self.typed_order, &s.criteria, &s.query))
    }
}
