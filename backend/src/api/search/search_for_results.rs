//! Search endpoint for result lists and groups.

use std::cmp::Ordering;

use common::search_query::SearchRequest;
use common::search_result::{GroupResult, SearchResults};

use crate::api::search::search_filter::filter_records;
use crate::local_dataset::LocalDataset;


/// Filters, sorts and windows the dataset. Returns the results and the total
/// number of matching records.
pub fn search_for_results<T: Clone>(
    dataset: &LocalDataset<T>,
    request: &SearchRequest,
) -> anyhow::Result<(SearchResults<T>, u64)> {
    let mut records = filter_records(dataset, request, None);
    sort_records(dataset, request, &mut records)?;
    let total_count = records.len() as u64;

    if !request.is_grouped() {
        let list = page(&records, request.skip, request.top);
        return Ok((SearchResults::List(list), total_count));
    }

    let Some(definition) = dataset.facet(&request.group) else {
        anyhow::bail!("Unknown group facet in request: {}", request.group);
    };

    // groups follow the facet's value order: biggest first, then by label
    let mut groups: Vec<(String, String, Vec<&T>)> = Vec::new();
    for record in records {
        for bucket in definition.buckets(record) {
            match groups.iter_mut().find(|(code, _, _)| code == &bucket.code) {
                Some((_, _, members)) => {
                    if !members.iter().any(|m| std::ptr::eq(*m, record)) {
                        members.push(record);
                    }
                }
                None => groups.push((bucket.code, bucket.label, vec![record])),
            }
        }
    }
    groups.sort_by_key(|(_, label, members)| (usize::MAX - members.len(), label.clone()));

    let groups = groups
        .into_iter()
        .map(|(code, label, members)| GroupResult {
            code,
            label,
            total_count: members.len() as u64,
            list: page(&members, request.skip, request.top),
        })
        .collect();
    Ok((SearchResults::Groups(groups), total_count))
}

fn page<T: Clone>(records: &[&T], skip: usize, top: Option<usize>) -> Vec<T> {
    let iter = records.iter().skip(skip).map(|r| (*r).clone());
    match top {
        Some(top) => iter.take(top).collect(),
        None => iter.collect(),
    }
}

fn sort_records<T>(dataset: &LocalDataset<T>, request: &SearchRequest, records: &mut [&T]) -> anyhow::Result<()> {
    if request.sort.is_empty() {
        return Ok(());
    }
    let mut comparators = Vec::with_capacity(request.sort.len());
    for sort in request.sort.iter() {
        let Some(compare) = dataset.sort_comparator(&sort.field_name) else {
            anyhow::bail!("Unknown sort field in request: {}", sort.field_name);
        };
        comparators.push((compare, sort.sort_descending));
    }
    records.sort_by(|a, b| {
        for (compare, descending) in comparators.iter() {
            let ordering = compare(*a, *b);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}
