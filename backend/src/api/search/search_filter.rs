//! Filter helpers for search requests.

use common::search_query::{FacetOperator, SearchRequest};

use crate::local_dataset::LocalDataset;


/// Rejects requests naming facets, groups or sort fields the dataset does not know.
pub fn validate_request<T>(dataset: &LocalDataset<T>, request: &SearchRequest) -> anyhow::Result<()> {
    for facet_code in request.facets.keys() {
        if dataset.facet(facet_code).is_none() {
            anyhow::bail!("Unknown facet in request: {}", facet_code);
        }
    }
    if request.is_grouped() && dataset.facet(&request.group).is_none() {
        anyhow::bail!("Unknown group facet in request: {}", request.group);
    }
    for sort in request.sort.iter() {
        if dataset.sort_comparator(&sort.field_name).is_none() {
            anyhow::bail!("Unknown sort field in request: {}", sort.field_name);
        }
    }
    Ok(())
}

/// True if the record passes the query, the criteria and every facet filter
/// except the one named by `ignored_facet`.
pub fn record_matches<T>(
    dataset: &LocalDataset<T>,
    record: &T,
    request: &SearchRequest,
    ignored_facet: Option<&str>,
) -> bool {
    if !dataset.matches_text(record, request.query.trim()) {
        return false;
    }
    if !dataset.matches_criteria(record, &request.criteria) {
        return false;
    }

    for (facet_code, input) in request.facets.iter() {
        if Some(facet_code.as_str()) == ignored_facet {
            continue;
        }
        let Some(definition) = dataset.facet(facet_code) else {
            continue;
        };
        if input.is_empty() {
            continue;
        }
        let values = definition.buckets(record);
        let has = |code: &String| values.iter().any(|b| &b.code == code);

        if !input.selected.is_empty() {
            let keep = match input.operator {
                FacetOperator::Or => input.selected.iter().any(has),
                FacetOperator::And => input.selected.iter().all(has),
            };
            if !keep {
                return false;
            }
        }
        if input.excluded.iter().any(has) {
            return false;
        }
    }
    true
}

/// Records matching the request, in dataset order.
pub fn filter_records<'a, T>(
    dataset: &'a LocalDataset<T>,
    request: &SearchRequest,
    ignored_facet: Option<&str>,
) -> Vec<&'a T> {
    dataset
        .records()
        .iter()
        .filter(|record| record_matches(dataset, *record, request, ignored_facet))
        .collect()
}
