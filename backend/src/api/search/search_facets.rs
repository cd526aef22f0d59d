//! Facet computation and response shaping.

use std::collections::{BTreeMap, HashSet};

use common::search_query::SearchRequest;
use common::search_result::{FacetOutput, FacetValue};

use crate::api::search::search_filter::filter_records;
use crate::local_dataset::{FacetDefinition, LocalDataset};


/// Computes every facet of the dataset for the request.
pub fn search_facets<T>(dataset: &LocalDataset<T>, request: &SearchRequest, value_limit: usize) -> Vec<FacetOutput> {
    dataset
        .facets()
        .iter()
        .map(|definition| search_string_facet(dataset, definition, request, value_limit))
        .collect()
}

/// Counts one facet's values. The facet's own filter is left out, so that the
/// counts show what a user would get back by changing this facet's selection.
pub fn search_string_facet<T>(
    dataset: &LocalDataset<T>,
    definition: &FacetDefinition<T>,
    request: &SearchRequest,
    value_limit: usize,
) -> FacetOutput {
    let records = filter_records(dataset, request, Some(&definition.code));

    let mut counts: BTreeMap<String, (String, u64)> = BTreeMap::new();
    for record in records {
        // a record listing the same value twice still counts once
        let mut present_values = HashSet::new();
        for bucket in definition.buckets(record) {
            if !present_values.insert(bucket.code.clone()) {
                continue;
            }
            let entry = counts.entry(bucket.code).or_insert((bucket.label, 0));
            entry.1 += 1;
        }
    }

    let mut facet_values = counts
        .into_iter()
        .map(|(code, (label, count))| FacetValue { code, label, count })
        .collect::<Vec<_>>();
    facet_values.sort_by_key(|item| (u64::MAX - item.count, item.label.clone()));
    let overflow = facet_values.split_off(value_limit.min(facet_values.len()));

    // values the user filtered on must stay listed even once they fall out of the top
    if let Some(input) = request.facets.get(&definition.code) {
        for code in input.selected.iter().chain(input.excluded.iter()) {
            if facet_values.iter().any(|v| &v.code == code) {
                continue;
            }
            let value = overflow
                .iter()
                .find(|v| &v.code == code)
                .cloned()
                .unwrap_or_else(|| FacetValue { code: code.clone(), label: code.clone(), count: 0 });
            facet_values.push(value);
        }
    }

    FacetOutput {
        code: definition.code.clone(),
        label: definition.label.clone(),
        is_multi_selectable: definition.is_multi_selectable,
        is_multi_valued: definition.is_multi_valued,
        can_exclude: definition.can_exclude,
        values: facet_values,
    }
}
